use bigdecimal::BigDecimal;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::str::FromStr;
use uuid::Uuid;

use bursar_core::domain::{Cadence, DeductionRule, NewRule, StipendClass};
use bursar_core::services::calculator;

fn rule(name: &str, base: &str, priority: i32) -> DeductionRule {
    DeductionRule::new(
        NewRule {
            name: name.to_string(),
            type_tag: "bench".to_string(),
            description: format!("{name} deduction"),
            base_amount: BigDecimal::from_str(base).unwrap(),
            min_amount: BigDecimal::from_str("0").unwrap(),
            max_amount: BigDecimal::from_str("100000").unwrap(),
            applies_to_full_scholar: true,
            applies_to_self_funded: true,
            cadence: Cadence::Monthly,
            is_optional: false,
            priority,
        },
        Some(Uuid::new_v4()),
    )
}

fn bench_calculate(c: &mut Criterion) {
    let small: Vec<DeductionRule> = (0..5)
        .map(|i| rule(&format!("rule-{i}"), "120.50", i))
        .collect();
    let large: Vec<DeductionRule> = (0..100)
        .map(|i| rule(&format!("rule-{i:03}"), "45.25", i % 10))
        .collect();
    let base = BigDecimal::from_str("5000.00").unwrap();

    c.bench_function("calculate_5_rules", |b| {
        b.iter(|| {
            calculator::calculate(
                black_box(StipendClass::SelfFunded),
                black_box(&base),
                black_box(&small),
            )
            .unwrap()
        })
    });

    c.bench_function("calculate_100_rules", |b| {
        b.iter(|| {
            calculator::calculate(
                black_box(StipendClass::SelfFunded),
                black_box(&base),
                black_box(&large),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_calculate);
criterion_main!(benches);
