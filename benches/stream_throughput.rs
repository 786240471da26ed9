use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use zio::*;

const VALUES: i64 = 100_000;

fn write_longs(config: &StreamConfig) -> Vec<u8> {
    let mut out = ZioOutput::memory(config);
    for i in 0..VALUES {
        out.write_i64(i).unwrap();
    }
    out.into_bytes().unwrap()
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_i64");
    group.throughput(Throughput::Bytes(VALUES as u64 * 8));
    for checksum in [ChecksumAlgorithm::None, ChecksumAlgorithm::Sha256] {
        let config = StreamConfig::default().with_checksum(checksum);
        group.bench_with_input(BenchmarkId::from_parameter(format!("{checksum:?}")), &config, |b, config| {
            b.iter(|| black_box(write_longs(config)))
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let bytes = write_longs(&StreamConfig::default());
    let mut group = c.benchmark_group("read_i64");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    for capacity in [1024usize, 16 * 1024] {
        let config = StreamConfig::default().with_buffer_capacity(capacity);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &config, |b, config| {
            b.iter(|| {
                let mut input = ZioInput::from_bytes(bytes.clone(), config);
                let mut sum = 0i64;
                for _ in 0..VALUES {
                    sum = sum.wrapping_add(input.read_i64().unwrap());
                }
                black_box(sum)
            })
        });
    }
    group.finish();
}

fn bench_count(c: &mut Criterion) {
    let items: Vec<String> = (0..10_000).map(|i| format!("item-{i}")).collect();
    c.bench_function("serialized_len_strings", |b| {
        b.iter(|| black_box(serialized_len(&items).unwrap()))
    });
}

criterion_group!(benches, bench_write, bench_read, bench_count);
criterion_main!(benches);
