//! Benchmark harness for tlsscope; see `benches/`.
