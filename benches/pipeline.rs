use chrono::{NaiveDate, TimeDelta};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use visit_analytics::cleaning::FeatureExtractor;
use visit_analytics::columns::{Column, ColumnNameTable};
use visit_analytics::config::PipelineConfig;
use visit_analytics::execution::{ExecutionEngine, ExecutionOptions};
use visit_analytics::pipeline::Pipeline;
use visit_analytics::processing::{bin, Aggregator};
use visit_analytics::types::{Checked, VisitRecord};

fn generate_records(n: usize) -> Vec<VisitRecord> {
    let Some(start) = NaiveDate::from_ymd_opt(2021, 1, 4).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return Vec::new();
    };
    (0..n)
        .map(|i| {
            let entry = start + TimeDelta::minutes((i * 7 + i % 13) as i64);
            let exit = entry + TimeDelta::minutes((15 + i % 240) as i64);
            VisitRecord {
                entry_date: if i % 50 == 0 {
                    "999".to_string()
                } else {
                    entry.format("%Y-%m-%d %H:%M:%S").to_string()
                },
                exit_date: exit.format("%Y-%m-%d %H:%M").to_string(),
                age: Checked::Valid(if i % 31 == 0 { 999.0 } else { (i % 95) as f64 }),
                gender: Checked::Valid(if i % 2 == 0 { "F" } else { "M" }.to_string()),
                department: Checked::Valid((i % 199).to_string()),
                duration: None,
            }
        })
        .collect()
}

fn bench_clean(c: &mut Criterion) {
    let extractor = FeatureExtractor::default();
    let engine = ExecutionEngine::new(ExecutionOptions::default()).ok();
    let mut group = c.benchmark_group("clean");
    for n in [1_000usize, 20_000] {
        let records = generate_records(n);
        group.bench_with_input(BenchmarkId::new("sequential", n), &records, |b, records| {
            b.iter(|| extractor.clean(black_box(records)))
        });
        if let Some(engine) = &engine {
            group.bench_with_input(BenchmarkId::new("parallel", n), &records, |b, records| {
                b.iter(|| engine.clean_parallel(&extractor, black_box(records)))
            });
        }
    }
    group.finish();
}

fn bench_group_and_bin(c: &mut Criterion) {
    let cleaned = FeatureExtractor::default().clean(&generate_records(20_000));
    let Ok(resolver) = ColumnNameTable::builtin().resolver("en") else {
        return;
    };
    let aggregator = Aggregator::new(resolver);

    c.bench_function("group_by_department", |b| {
        b.iter(|| aggregator.group_by(black_box(&cleaned.visits), &[Column::Department], Column::Duration))
    });

    let ages = cleaned.numeric_values(Column::Age);
    c.bench_function("bin_age", |b| b.iter(|| bin(black_box(&ages), 10)));
}

fn bench_pipeline(c: &mut Criterion) {
    let Ok(pipeline) = Pipeline::new(PipelineConfig::default()) else {
        return;
    };
    let records = generate_records(20_000);
    c.bench_function("pipeline_run", |b| b.iter(|| pipeline.run(black_box(&records))));
}

criterion_group!(benches, bench_clean, bench_group_and_bin, bench_pipeline);
criterion_main!(benches);
