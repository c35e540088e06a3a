use std::hint::black_box;

use churnguard::dataset::Frame;
use churnguard::features::build_features;
use churnguard::record::{RawValue, Record};
use churnguard::serving::ServeTransform;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

const ROW_COUNT: usize = 1_000;
const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const PAYMENTS: [&str; 4] = [
    "Bank transfer (automatic)",
    "Credit card (automatic)",
    "Electronic check",
    "Mailed check",
];

fn record(i: usize) -> Record {
    let tenure = (i % 72) as i64 + 1;
    let contract = CONTRACTS[i % 3];
    Record::new()
        .with("gender", if i % 2 == 0 { "Female" } else { "Male" })
        .with("Partner", if i % 3 == 0 { "Yes" } else { "No" })
        .with("tenure", tenure)
        .with("Contract", contract)
        .with("PaymentMethod", PAYMENTS[i % 4])
        .with("MonthlyCharges", 20.0 + (i % 90) as f64)
        .with("TotalCharges", (20.0 + (i % 90) as f64) * tenure as f64)
        .with(
            "Churn",
            if contract == "Month-to-month" && tenure < 12 { "Yes" } else { "No" },
        )
}

fn setup() -> (ServeTransform, Vec<Record>) {
    let records: Vec<Record> = (0..ROW_COUNT).map(record).collect();
    let frame = Frame::from_rows(records.iter().map(|r| {
        r.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect::<Vec<(String, RawValue)>>()
    }));
    let encoded = build_features(&frame, "Churn").expect("encode");
    let schema = encoded.schema().expect("schema");
    let transform = ServeTransform::new(encoded.plan, schema).expect("transform");
    (transform, records)
}

fn bench_transform(c: &mut Criterion) {
    let (transform, records) = setup();
    c.bench_function("transform_single", |b| {
        b.iter(|| transform.transform(black_box(&records[0])));
    });
    c.bench_with_input(
        BenchmarkId::new("transform_batch", ROW_COUNT),
        &records,
        |b, records| {
            b.iter(|| {
                transform
                    .transform_batch(black_box(records))
                    .expect("transform_batch")
            });
        },
    );
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
