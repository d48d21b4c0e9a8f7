use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sheetstream::convert::{convert_to_csv, stream_rows, ConvertOptions};
use sheetstream::generator::{generate, GeneratorConfig};
use sheetstream::transform::row_sink;
use tempfile::{tempdir, NamedTempFile};

fn benchmark_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(10);

    for size in [1_000u64, 10_000, 100_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let temp = NamedTempFile::new().unwrap();
                let mut rng = StdRng::seed_from_u64(size);
                let summary =
                    generate(size, &GeneratorConfig::default(), &mut rng, temp.path()).unwrap();
                black_box(summary);
            });
        });
    }

    group.finish();
}

fn benchmark_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert");
    group.sample_size(10);

    for size in [1_000u64, 10_000, 100_000].iter() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("students.xlsx");
        let output = dir.path().join("students.csv");
        let mut rng = StdRng::seed_from_u64(*size);
        generate(*size, &GeneratorConfig::default(), &mut rng, &input).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let summary = convert_to_csv(&input, &output, &ConvertOptions::default()).unwrap();
                black_box(summary);
            });
        });
    }

    group.finish();
}

fn benchmark_parse_only(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let input = dir.path().join("students.xlsx");
    let mut rng = StdRng::seed_from_u64(7);
    generate(100_000, &GeneratorConfig::default(), &mut rng, &input).unwrap();

    let mut group = c.benchmark_group("parse");
    group.sample_size(10);
    group.bench_function("100000_rows", |b| {
        b.iter(|| {
            let mut cells_seen = 0usize;
            stream_rows(
                &input,
                &mut row_sink(|_row, cells| {
                    cells_seen += cells.len();
                    Ok(())
                }),
            )
            .unwrap();
            black_box(cells_seen);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_generate,
    benchmark_convert,
    benchmark_parse_only
);
criterion_main!(benches);
