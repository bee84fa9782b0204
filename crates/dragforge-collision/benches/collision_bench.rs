//! Benchmark: indexed vs linear rect intersection.
//!
//! Run with: `cargo bench -p dragforge-collision --bench collision_bench`
//!
//! Measures one detection pass over a grid of drop targets, with and without
//! the quadtree, for board-sized target counts.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use dragforge_collision::{
    CollisionCandidate, CollisionContext, CollisionStrategy, QuadTree, QuadTreeConfig,
    RectIntersection,
};
use dragforge_core::{ElementId, ElementTree, Rect};

fn grid(count: u32) -> Vec<CollisionCandidate> {
    let columns = 40;
    (0..count)
        .map(|i| {
            let x = f64::from(i % columns) * 50.0;
            let y = f64::from(i / columns) * 50.0;
            let order = u64::from(i);
            CollisionCandidate::new(
                format!("cell-{i}"),
                ElementId(order),
                Rect::new(x, y, 45.0, 45.0),
                order,
            )
        })
        .collect()
}

// ===========================================================================
// Detection pass
// ===========================================================================

fn bench_rect_intersection(c: &mut Criterion) {
    let mut group = c.benchmark_group("rect_intersection");
    let tree = ElementTree::new(Rect::new(0.0, 0.0, 2000.0, 2000.0));
    let drag_rect = Rect::new(610.0, 610.0, 80.0, 80.0);
    let context = CollisionContext {
        position: drag_rect.center(),
        drag_rect,
        viewport: tree_viewport(),
        tree: &tree,
    };

    for count in [50u32, 400, 1600] {
        let candidates = grid(count);

        let mut indexed = RectIntersection::new();
        group.bench_with_input(BenchmarkId::new("indexed", count), &candidates, |b, cs| {
            b.iter(|| black_box(indexed.detect(&context, cs)));
        });

        let mut linear = RectIntersection::with_index(usize::MAX, QuadTreeConfig::default());
        group.bench_with_input(BenchmarkId::new("linear", count), &candidates, |b, cs| {
            b.iter(|| black_box(linear.detect(&context, cs)));
        });
    }
    group.finish();
}

fn tree_viewport() -> Rect {
    Rect::new(0.0, 0.0, 2000.0, 2000.0)
}

// ===========================================================================
// Quadtree query only
// ===========================================================================

fn bench_quadtree_query(c: &mut Criterion) {
    let mut index = QuadTree::new(tree_viewport());
    for candidate in grid(1600) {
        index.insert(candidate.rect, candidate.order);
    }
    let area = Rect::new(610.0, 610.0, 80.0, 80.0);
    c.bench_function("quadtree_query_1600", |b| {
        b.iter(|| black_box(index.query(black_box(&area)).len()));
    });
}

criterion_group!(benches, bench_rect_intersection, bench_quadtree_query);
criterion_main!(benches);
