use criterion::{Criterion, black_box, criterion_group, criterion_main};

use cobrado_billing::{DEFAULT_PLATFORM_FEE_BPS, FeeBreakdown, FeeSchedule, PaymentMethod};

fn bench_fee_breakdown(c: &mut Criterion) {
    let schedule = FeeSchedule::default();

    let mut group = c.benchmark_group("fee_breakdown");

    for (name, method) in [
        ("pix", PaymentMethod::Pix),
        ("boleto", PaymentMethod::Boleto),
        ("credit_card", PaymentMethod::CreditCard),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                FeeBreakdown::compute(
                    black_box(123_456),
                    black_box(DEFAULT_PLATFORM_FEE_BPS),
                    black_box(method),
                    black_box(&schedule),
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fee_breakdown);
criterion_main!(benches);
