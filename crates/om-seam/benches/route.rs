use criterion::{Criterion, black_box, criterion_group, criterion_main};
use om_core::Image;
use om_seam::{CostGrid, Orientation, SeamLayout, route_phase};

fn synthetic_edges(width: usize, height: usize) -> Image<bool> {
    let mut data = vec![false; width * height];
    for y in 0..height {
        for x in 0..width {
            // Sparse diagonal streaks, similar to field boundaries.
            data[y * width + x] = (x + 2 * y) % 37 == 0 || (3 * x + y) % 53 == 0;
        }
    }
    Image::from_vec(width, height, data).expect("valid image")
}

fn bench_route_network(c: &mut Criterion) {
    let (width, height) = (512usize, 512usize);
    let edges = synthetic_edges(width, height);
    let layout = SeamLayout::new(width, height, 8, 256).expect("layout");

    c.bench_function("om_seam_route_network_512x512", |b| {
        b.iter(|| {
            let mut grid = CostGrid::from_edges(black_box(&edges));
            let mut n = 0;
            for orientation in Orientation::ALL {
                n += route_phase(&mut grid, &layout, orientation)
                    .expect("route")
                    .len();
            }
            black_box(n);
        });
    });
}

criterion_group!(benches, bench_route_network);
criterion_main!(benches);
