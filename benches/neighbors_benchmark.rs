use criterion::measurement::Measurement;
use criterion::{criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::distr::{Distribution, Uniform};
use rand::{rngs::StdRng, SeedableRng};
use single_manifold::callbacks::EuclideanDistance;
use single_manifold::neighbors::find_neighbors;
use single_manifold::NeighborsMethod;
use std::time::Duration;

#[derive(Clone)]
pub struct NeighborsConfig {
    seed: u64,
    sizes: Vec<usize>,
    dimensions: Vec<usize>,
    neighbor_counts: Vec<usize>,
    measurement_time: u64,
    sample_size: usize,
}

impl Default for NeighborsConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            sizes: vec![500, 2000, 5000],
            dimensions: vec![3, 10],
            neighbor_counts: vec![5, 15],
            measurement_time: 10,
            sample_size: 10,
        }
    }
}

fn create_test_data(dimension: usize, n: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let value_dist = Uniform::try_from(0.0..1.0).unwrap();
    Array2::from_shape_fn((dimension, n), |_| value_dist.sample(&mut rng))
}

fn configure_group<'a, M: Measurement>(
    c: &'a mut Criterion<M>,
    name: &str,
    config: &NeighborsConfig,
) -> BenchmarkGroup<'a, M> {
    let mut group = c.benchmark_group(name);
    group.measurement_time(Duration::from_secs(config.measurement_time));
    group.sample_size(config.sample_size);
    group
}

pub fn bench_neighbor_search(c: &mut Criterion) {
    let config = NeighborsConfig::default();
    let mut group = configure_group(c, "Neighbor_Search", &config);

    for &n in config.sizes.iter() {
        for &dimension in config.dimensions.iter() {
            let seed = config.seed + (n * dimension) as u64;
            let data = create_test_data(dimension, n, seed);
            let distance = EuclideanDistance::new(data.view());
            let indices: Vec<usize> = (0..n).collect();

            for &k in config.neighbor_counts.iter() {
                for method in NeighborsMethod::ALL {
                    group.bench_with_input(
                        BenchmarkId::new(method.token(), format!("n{}_d{}_k{}", n, dimension, k)),
                        &(n, dimension, k),
                        |b, _| {
                            b.iter(|| find_neighbors(method, &indices, &distance, k).unwrap());
                        },
                    );
                }
            }
        }
    }

    group.finish();
}

criterion_group!(benches, bench_neighbor_search);
criterion_main!(benches);
