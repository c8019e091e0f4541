use criterion::{Criterion, black_box, criterion_group, criterion_main};
use om_core::Image;
use om_edge::{EdgeConfig, EdgeDetector};

/// Field boundary: a bright parcel with a ragged diagonal border.
fn parcel_band(width: usize, height: usize) -> Image<f32> {
    let mut band = Image::new_fill(width, height, 0.2f32);
    for y in 0..height {
        let border = width / 3 + y / 2 + (y % 7);
        for v in band.row_mut(y).iter_mut().skip(border) {
            *v = 0.8;
        }
    }
    band
}

fn bench_edge_mask(c: &mut Criterion) {
    let band = parcel_band(1024, 768);
    let cfg = EdgeConfig::default();
    let mut detector = EdgeDetector::new();

    c.bench_function("edge_mask_1024x768", |b| {
        b.iter(|| {
            let mask = detector.detect(black_box(&band.as_view()), black_box(&cfg));
            black_box(mask.len())
        });
    });
}

criterion_group!(benches, bench_edge_mask);
criterion_main!(benches);
