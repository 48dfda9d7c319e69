//! Merge engine benchmarks

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use naivetrack::{MergeConfig, TrackParser};

fn source(sample: usize, records: u64) -> Vec<u8> {
    let mut text = String::new();
    for index in 0..records {
        let coordinate = index * 7 + sample as u64;
        text.push_str(&format!(
            "chr1\t{coordinate}\tA\t1\t3\t30\n\tC\t3\t30\tS{sample}, forward\n"
        ));
    }
    text.into_bytes()
}

fn benchmark_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for n_sources in [1usize, 4, 16] {
        let sources: Vec<Vec<u8>> = (0..n_sources).map(|sample| source(sample, 5_000)).collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(n_sources),
            &sources,
            |b, sources| {
                b.iter(|| {
                    let mut parser = TrackParser::with_config(MergeConfig::default())
                        .expect("valid merge configuration");
                    for data in sources {
                        parser.register(Cursor::new(data.as_slice()));
                    }
                    let mut merged = 0usize;
                    while let Some(entry) = parser.next_entry().expect("merge succeeds") {
                        merged += entry.alleles().len();
                    }
                    black_box(merged)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_merge);
criterion_main!(benches);
