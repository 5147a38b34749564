use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use meshlet_pack::builder::pack_meshlets;
use meshlet_pack::PackingConfig;

/// Index buffer of an n x n quad grid, two triangles per cell.
fn grid_indices(n: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((n * n * 6) as usize);

    for y in 0..n {
        for x in 0..n {
            let v = y * (n + 1) + x;

            indices.extend_from_slice(&[v, v + 1, v + n + 1]);
            indices.extend_from_slice(&[v + 1, v + n + 2, v + n + 1]);
        }
    }

    indices
}

fn bench_pack_meshlets(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_meshlets");

    for n in [64, 256] {
        let indices = grid_indices(n);
        let vertex_count = ((n + 1) * (n + 1)) as usize;
        let triangles = indices.len() as u64 / 3;

        group.throughput(Throughput::Elements(triangles));

        group.bench_with_input(BenchmarkId::new("capacity", triangles), &indices, |b, indices| {
            let config = PackingConfig::default();

            b.iter(|| pack_meshlets(indices, vertex_count, &config));
        });

        group.bench_with_input(BenchmarkId::new("bit_budget", triangles), &indices, |b, indices| {
            let config = PackingConfig {
                max_block_bits: Some(4096),
                ..Default::default()
            };

            b.iter(|| pack_meshlets(indices, vertex_count, &config));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pack_meshlets);
criterion_main!(benches);
