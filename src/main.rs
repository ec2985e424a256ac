use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::info;
use ndarray::Array2;
use single_manifold::callbacks::{
    DenseFeatures, DistanceCallback, EuclideanDistance, GaussianKernel, KernelCallback, LinearKernel,
    PrecomputedDistance, PrecomputedKernel,
};
use single_manifold::io::{read_matrix, write_embedding};
use single_manifold::{
    embed, Callbacks, EigenMethod, Embedding, LogProgress, NeighborsMethod, ParameterKey, Parameters, ReductionMethod,
};
use std::path::PathBuf;

/// Kernel handed to the kernel methods
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum KernelKind {
    /// Inner product of the feature vectors
    #[default]
    Linear,
    /// exp(-||a - b||² / width)
    Gaussian,
}

#[derive(Parser, Debug)]
#[command(name = "single-manifold")]
#[command(about = "Embeds observations into a low-dimensional space")]
#[command(version)]
struct Args {
    /// Reduction method: kltsa, klle, mds, lmds, isomap, lisomap, diffusion_map,
    /// kpca, pca, laplacian_eigenmaps, lpp, npe, lltsa or spe
    method: ReductionMethod,

    /// Neighbor search: brute or covertree
    neighbors_method: NeighborsMethod,

    /// Eigendecomposition: dense, arpack or randomized
    eigen_method: EigenMethod,

    /// Number of nearest neighbors
    number_of_neighbors: usize,

    /// Dimension of the embedding
    target_dimension: usize,

    /// Observations, one per line
    #[arg(long, default_value = "input.dat")]
    input: PathBuf,

    /// Embedding, one dimension per line
    #[arg(long, default_value = "output.dat")]
    output: PathBuf,

    /// Materialize the kernel and distance matrices before embedding
    #[arg(long)]
    precompute: bool,

    #[arg(long, value_enum, default_value_t = KernelKind::Linear)]
    kernel: KernelKind,

    /// Width of the gaussian kernel, also used by heat kernel weights
    #[arg(long, default_value_t = 1000.0)]
    kernel_width: f64,
}

fn run<K: KernelCallback, D: DistanceCallback>(
    kernel: &K,
    distance: &D,
    features: &DenseFeatures<'_>,
    indices: &[usize],
    params: &Parameters,
) -> anyhow::Result<Embedding> {
    let callbacks = Callbacks::new(kernel, distance, features);
    embed(indices, &callbacks, params, &LogProgress).context("embedding failed")
}

fn embed_with_kernel<K: KernelCallback>(
    kernel: &K,
    data: &Array2<f64>,
    params: &Parameters,
    precompute: bool,
) -> anyhow::Result<Embedding> {
    let n = data.ncols();
    let indices: Vec<usize> = (0..n).collect();
    let distance = EuclideanDistance::new(data.view());
    let features = DenseFeatures::new(data.view());

    if precompute {
        info!("Precomputing kernel and distance matrices");
        let kernel = PrecomputedKernel::materialize(n, kernel).context("failed to precompute kernel matrix")?;
        let distance =
            PrecomputedDistance::materialize(n, &distance).context("failed to precompute distance matrix")?;
        run(&kernel, &distance, &features, &indices, params)
    } else {
        run(kernel, &distance, &features, &indices, params)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    anyhow::ensure!(
        args.kernel_width > 0.0 && args.kernel_width.is_finite(),
        "kernel width must be positive, got {}",
        args.kernel_width
    );

    let data = read_matrix(&args.input).with_context(|| format!("failed to load {}", args.input.display()))?;
    let (dimension, n) = data.dim();
    info!("Data contains {} feature vectors with dimension of {}", n, dimension);

    let params = Parameters::with_defaults()
        .with(ParameterKey::ReductionMethod, args.method)
        .with(ParameterKey::NeighborsMethod, args.neighbors_method)
        .with(ParameterKey::EigenMethod, args.eigen_method)
        .with(ParameterKey::NumberOfNeighbors, args.number_of_neighbors)
        .with(ParameterKey::TargetDimension, args.target_dimension)
        .with(ParameterKey::CurrentDimension, dimension)
        .with(ParameterKey::GaussianKernelWidth, args.kernel_width);

    let embedding = match args.kernel {
        KernelKind::Linear => embed_with_kernel(&LinearKernel::new(data.view()), &data, &params, args.precompute)?,
        KernelKind::Gaussian => {
            let kernel = GaussianKernel::new(data.view(), args.kernel_width);
            embed_with_kernel(&kernel, &data, &params, args.precompute)?
        }
    };

    write_embedding(&args.output, &embedding.coordinates)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(
        "Wrote {}x{} embedding to {}",
        embedding.target_dimension(),
        embedding.len(),
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("single-manifold").chain(args.iter().copied()))
    }

    #[test]
    fn test_positional_selectors_and_defaults() {
        let args = parse(&["lisomap", "covertree", "arpack", "10", "2"]).unwrap();
        assert_eq!(args.method, ReductionMethod::LandmarkIsomap);
        assert_eq!(args.neighbors_method, NeighborsMethod::CoverTree);
        assert_eq!(args.eigen_method, EigenMethod::Iterative);
        assert_eq!(args.number_of_neighbors, 10);
        assert_eq!(args.target_dimension, 2);
        assert_eq!(args.input, PathBuf::from("input.dat"));
        assert_eq!(args.output, PathBuf::from("output.dat"));
        assert_eq!(args.kernel, KernelKind::Linear);
        assert!(!args.precompute);
    }

    #[test]
    fn test_options() {
        let args = parse(&[
            "kpca", "brute", "dense", "5", "3", "--kernel", "gaussian", "--kernel-width", "2.5", "--precompute",
            "--input", "data.txt",
        ])
        .unwrap();
        assert_eq!(args.kernel, KernelKind::Gaussian);
        assert_eq!(args.kernel_width, 2.5);
        assert!(args.precompute);
        assert_eq!(args.input, PathBuf::from("data.txt"));
    }

    #[test]
    fn test_wrong_arity_is_a_usage_error() {
        let err = parse(&["mds", "brute", "dense", "10"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);

        let err = parse(&["mds", "brute", "dense", "10", "2", "extra"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unknown_tokens_are_rejected() {
        for args in [
            ["tsne", "brute", "dense", "10", "2"],
            ["mds", "kdtree", "dense", "10", "2"],
            ["mds", "brute", "lapack", "10", "2"],
            ["mds", "brute", "dense", "ten", "2"],
        ] {
            let err = parse(&args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
            assert_eq!(err.exit_code(), 2);
        }
    }
}
