//! Record protection throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tlsscope_core::cipher_suites;
use tlsscope_core::prf::Prf;
use tlsscope_core::{ContentType, CryptoContext, ProtocolVersion, SecurityParameters};
use tlsscope_crypto_rustcrypto::RustCryptoProvider;

const SUITES: [u16; 5] = [0x0005, 0x000a, 0x002f, 0x003d, 0x009c];
const SIZES: [usize; 3] = [64, 1024, 16384];

fn params(provider: &RustCryptoProvider, suite_id: u16) -> SecurityParameters {
    let suite = cipher_suites::lookup(suite_id).unwrap();
    let prf = Prf::for_suite(ProtocolVersion::Tls12, suite);
    SecurityParameters::from_master_secret(provider, &prf, suite_id, &[0x4d; 48], &[1; 32], &[2; 32])
        .unwrap()
}

/// Benchmark record encryption per cipher suite and fragment size
fn benchmark_encrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_encrypt");
    let provider = RustCryptoProvider::new();

    for suite_id in SUITES {
        let params = params(&provider, suite_id);
        let name = params.suite().name;
        for size in SIZES {
            let payload = vec![0xa5; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &payload, |b, payload| {
                let mut sender =
                    CryptoContext::new(&provider, &params, params.client_keystore()).unwrap();
                b.iter(|| {
                    let record = sender
                        .encrypt_data(&provider, ContentType::ApplicationData, payload)
                        .unwrap();
                    black_box(record)
                });
            });
        }
    }

    group.finish();
}

/// Benchmark encrypt + decrypt of one record, the cost an inline
/// decrypting proxy pays per record
fn benchmark_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_round_trip");
    let provider = RustCryptoProvider::new();

    for suite_id in SUITES {
        let params = params(&provider, suite_id);
        let name = params.suite().name;
        for size in SIZES {
            let payload = vec![0x5a; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &payload, |b, payload| {
                let mut sender =
                    CryptoContext::new(&provider, &params, params.client_keystore()).unwrap();
                let mut receiver =
                    CryptoContext::new(&provider, &params, params.client_keystore()).unwrap();
                b.iter(|| {
                    let record = sender
                        .encrypt_data(&provider, ContentType::ApplicationData, payload)
                        .unwrap();
                    let plaintext = receiver
                        .decrypt(&provider, ContentType::ApplicationData, &record)
                        .unwrap();
                    black_box(plaintext)
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, benchmark_encrypt, benchmark_round_trip);
criterion_main!(benches);
