use criterion::*;
use geo::{Coordinate, Line};
use rand::{thread_rng, Rng};

use geo_traploc::TrapMap;

const NUM_SEGMENTS: usize = 1024;

/// Non-crossing input: one segment per horizontal strip.
fn strip_segments<R: Rng>(rng: &mut R, n: usize) -> Vec<Line<f64>> {
    let height = 180. / n as f64;
    (0..n)
        .map(|i| {
            let y0 = -90. + height * i as f64;
            let x1 = rng.gen_range(-90.0..-1.0);
            let x2 = rng.gen_range(1.0..90.0);
            let y1 = y0 + rng.gen_range(0.0..0.4) * height;
            let y2 = y0 + rng.gen_range(0.5..0.9) * height;
            Line::from([(x1, y1), (x2, y2)])
        })
        .collect()
}

fn uniform_queries<R: Rng>(rng: &mut R, n: usize) -> Vec<Coordinate<f64>> {
    (0..n)
        .map(|_| Coordinate {
            x: rng.gen_range(-89.0..89.0),
            y: rng.gen_range(-89.0..89.0),
        })
        .collect()
}

fn build(c: &mut Criterion) {
    let lines = strip_segments(&mut thread_rng(), NUM_SEGMENTS);
    c.bench_function("trapezoidal map - build", |b| {
        b.iter(|| TrapMap::build(lines.iter().copied(), &mut thread_rng()))
    });
}

fn locate(c: &mut Criterion) {
    const NUM_QUERIES: usize = 1024;

    let lines = strip_segments(&mut thread_rng(), NUM_SEGMENTS);
    let queries = uniform_queries(&mut thread_rng(), NUM_QUERIES);
    let map = TrapMap::build(lines.iter().copied(), &mut thread_rng());

    c.bench_function("trapezoidal map - locate", |b| {
        b.iter(|| {
            for &pt in queries.iter() {
                black_box(map.locate(pt).top());
            }
        })
    });
    c.bench_function("brute force - locate", |b| {
        b.iter(|| {
            for &pt in queries.iter() {
                // Nearest segment above the point, scanning all input.
                let mut best = (f64::MAX, None);
                for line in lines.iter() {
                    let (lo, hi) = if line.start.x <= line.end.x {
                        (line.start, line.end)
                    } else {
                        (line.end, line.start)
                    };
                    if lo.x > pt.x || hi.x < pt.x {
                        continue;
                    }
                    let y = lo.y + (hi.y - lo.y) / (hi.x - lo.x) * (pt.x - lo.x);
                    if y > pt.y && y < best.0 {
                        best = (y, Some(line));
                    }
                }
                black_box(best.1);
            }
        })
    });
}

criterion_group!(traploc, build, locate);
criterion_main!(traploc);
