//! Pipeline latency benchmarks.
//!
//! - Single request latency (the interactive path)
//! - Batch sizes (1, 10, 100, 1K)
//! - Artifact loading, JSON vs native binary

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use jobimpact::persist::Format;
use jobimpact::request::{INDUSTRIES, JOB_TITLES};
use jobimpact::{testing, ModelContext, Orchestrator, PipelineConfig, PipelineOptions, RawParams};

fn orchestrator() -> Orchestrator {
    let context = testing::demo_context().expect("demo context");
    Orchestrator::new(context, PipelineOptions::default())
}

/// Deterministic spread of postings over industries and titles.
fn requests(n: usize) -> Vec<RawParams> {
    (0..n)
        .map(|i| {
            let mut params = testing::example_params();
            params.insert("industry".into(), INDUSTRIES[i % INDUSTRIES.len()].into());
            params.insert("job_title".into(), JOB_TITLES[i % JOB_TITLES.len()].into());
            params.insert("ai_intensity_score".into(), ((i % 11) as f64 / 10.0).into());
            params
        })
        .collect()
}

fn bench_single_request(c: &mut Criterion) {
    let orch = orchestrator();
    let params = testing::example_params();

    c.bench_function("pipeline/single", |b| {
        b.iter(|| black_box(orch.predict(black_box(&params))))
    });
}

fn bench_batch_sizes(c: &mut Criterion) {
    let orch = orchestrator();
    let mut group = c.benchmark_group("pipeline/batch_size");

    for batch_size in [1usize, 10, 100, 1_000] {
        let batch = requests(batch_size);
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch, |b, batch| {
            b.iter(|| black_box(orch.predict_batch(black_box(batch))))
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let models = testing::demo_models().expect("demo models");
    let mut group = c.benchmark_group("pipeline/load");

    for format in [Format::Json, Format::Binary] {
        let dir = tempfile::tempdir().expect("temp dir");
        models.write(dir.path(), format).expect("write artifacts");
        let config = PipelineConfig::builder()
            .model_dir(dir.path())
            .build()
            .expect("config");

        group.bench_function(format.extension(), |b| {
            b.iter(|| black_box(ModelContext::load(&config).expect("load")))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_request, bench_batch_sizes, bench_load);
criterion_main!(benches);
