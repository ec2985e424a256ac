//! Callbacks computed on demand from a dense features × observations matrix.

use super::{DistanceCallback, FeatureVectorCallback, KernelCallback};
use ndarray::{Array1, ArrayView1, ArrayView2};

fn squared_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x - y) * (x - y))
        .sum()
}

/// Column `i` of the matrix is the feature vector of observation `i`.
#[derive(Debug, Clone, Copy)]
pub struct DenseFeatures<'a> {
    data: ArrayView2<'a, f64>,
}

impl<'a> DenseFeatures<'a> {
    pub fn new(data: ArrayView2<'a, f64>) -> Self {
        DenseFeatures { data }
    }

    pub fn dimension(&self) -> usize {
        self.data.nrows()
    }
}

impl FeatureVectorCallback for DenseFeatures<'_> {
    fn feature_vector(&self, index: usize) -> Array1<f64> {
        self.data.column(index).to_owned()
    }
}

/// Dot product between observation columns.
#[derive(Debug, Clone, Copy)]
pub struct LinearKernel<'a> {
    data: ArrayView2<'a, f64>,
}

impl<'a> LinearKernel<'a> {
    pub fn new(data: ArrayView2<'a, f64>) -> Self {
        LinearKernel { data }
    }
}

impl KernelCallback for LinearKernel<'_> {
    fn kernel(&self, a: usize, b: usize) -> f64 {
        self.data.column(a).dot(&self.data.column(b))
    }
}

/// `exp(-||a - b||² / width)`
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel<'a> {
    data: ArrayView2<'a, f64>,
    width: f64,
}

impl<'a> GaussianKernel<'a> {
    pub fn new(data: ArrayView2<'a, f64>, width: f64) -> Self {
        GaussianKernel { data, width }
    }
}

impl KernelCallback for GaussianKernel<'_> {
    fn kernel(&self, a: usize, b: usize) -> f64 {
        (-squared_euclidean(self.data.column(a), self.data.column(b)) / self.width).exp()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EuclideanDistance<'a> {
    data: ArrayView2<'a, f64>,
}

impl<'a> EuclideanDistance<'a> {
    pub fn new(data: ArrayView2<'a, f64>) -> Self {
        EuclideanDistance { data }
    }
}

impl DistanceCallback for EuclideanDistance<'_> {
    fn distance(&self, a: usize, b: usize) -> f64 {
        squared_euclidean(self.data.column(a), self.data.column(b)).sqrt()
    }
}
