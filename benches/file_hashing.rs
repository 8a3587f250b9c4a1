use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use dupe_engine::hasher;

async fn create_test_file(size: usize) -> NamedTempFile {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let data = vec![0u8; size];
    let mut async_file = tokio::fs::File::create(temp_file.path())
        .await
        .expect("Failed to create async file");
    async_file.write_all(&data).await.expect("Failed to write test data");
    async_file.flush().await.expect("Failed to flush file");
    temp_file
}

const FILE_SIZE_1KB: usize = 1024;
const FILE_SIZE_10KB: usize = 10 * FILE_SIZE_1KB;
const FILE_SIZE_100KB: usize = 100 * FILE_SIZE_1KB;
const FILE_SIZE_1MB: usize = 1024 * FILE_SIZE_1KB;
const FILE_SIZE_10MB: usize = 10 * FILE_SIZE_1MB;

/// Benchmarks the front-hash stage (the one every file pays, regardless of mode).
fn bench_hash_front_by_size(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let file_sizes = vec![
        FILE_SIZE_1KB,
        FILE_SIZE_10KB,
        FILE_SIZE_100KB,
        FILE_SIZE_1MB,
        FILE_SIZE_10MB,
    ];

    let mut group = c.benchmark_group("hash_front_by_size");
    for size in file_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("hash_front", format_size(size)),
            &size,
            |b, &size| {
                b.iter(|| {
                    rt.block_on(async {
                        let temp_file = create_test_file(size).await;
                        let result = hasher::hash_front(temp_file.path(), size as u64).await;
                        black_box(result.expect("hash_front failed"));
                    })
                });
            },
        );
    }
    group.finish();
}

/// Benchmarks the whole-file hash used by `--mode full`, where every byte is read.
fn bench_hash_full_by_size(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let file_sizes = vec![FILE_SIZE_100KB, FILE_SIZE_1MB, FILE_SIZE_10MB];

    let mut group = c.benchmark_group("hash_full_by_size");
    for size in file_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("hash_full", format_size(size)),
            &size,
            |b, &size| {
                b.iter(|| {
                    rt.block_on(async {
                        let temp_file = create_test_file(size).await;
                        let result = hasher::hash_full(temp_file.path()).await;
                        black_box(result.expect("hash_full failed"));
                    })
                });
            },
        );
    }
    group.finish();
}

/// Tests how the staged algorithm's per-file cost scales when hashing many
/// files concurrently, the shape of a real `--mode normal` run.
fn bench_parallel_front_hashing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let file_counts = vec![1, 2, 4, 8, 16, 32];
    let file_size = 100 * 1024;

    let mut group = c.benchmark_group("parallel_front_hashing");
    for count in file_counts {
        group.bench_with_input(BenchmarkId::new("files", count), &count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let mut temp_files = Vec::new();
                    for _ in 0..count {
                        temp_files.push(create_test_file(file_size).await);
                    }

                    let tasks: Vec<_> = temp_files
                        .iter()
                        .map(|f| hasher::hash_front(f.path(), file_size as u64))
                        .collect();

                    let results = futures::future::join_all(tasks).await;
                    for result in results {
                        black_box(result.expect("hash_front failed"));
                    }
                })
            });
        });
    }
    group.finish();
}

fn format_size(size: usize) -> String {
    if size >= 1024 * 1024 {
        format!("{}MB", size / (1024 * 1024))
    } else if size >= 1024 {
        format!("{}KB", size / 1024)
    } else {
        format!("{size}B")
    }
}

criterion_group!(
    benches,
    bench_hash_front_by_size,
    bench_hash_full_by_size,
    bench_parallel_front_hashing
);
criterion_main!(benches);
