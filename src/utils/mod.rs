use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

pub(crate) fn to_dmatrix(array: ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(array.nrows(), array.ncols(), |i, j| array[[i, j]])
}

pub(crate) fn to_array2(matrix: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(i, j)| matrix[(i, j)])
}

pub(crate) fn to_dvector(array: ArrayView1<f64>) -> DVector<f64> {
    DVector::from_iterator(array.len(), array.iter().copied())
}

pub(crate) fn to_array1(vector: &DVector<f64>) -> Array1<f64> {
    Array1::from_iter(vector.iter().copied())
}

/// Replaces `a` by `(a + aᵀ) / 2`.
pub(crate) fn symmetrize(a: &mut Array2<f64>) {
    let n = a.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let mean = 0.5 * (a[[i, j]] + a[[j, i]]);
            a[[i, j]] = mean;
            a[[j, i]] = mean;
        }
    }
}

/// Replaces a square matrix `a` by `J a J` with `J = I - 11ᵀ/n`.
pub(crate) fn double_center(a: &mut Array2<f64>) {
    let n = a.nrows();
    if n == 0 {
        return;
    }
    let row_means: Array1<f64> = a.sum_axis(Axis(1)) / n as f64;
    let col_means: Array1<f64> = a.sum_axis(Axis(0)) / n as f64;
    let grand_mean = row_means.sum() / n as f64;

    for ((i, j), value) in a.indexed_iter_mut() {
        *value += grand_mean - row_means[i] - col_means[j];
    }
}

/// Subtracts the mean observation (column mean over rows) from every column.
/// Returns the removed mean.
pub(crate) fn center_observations(features: &mut Array2<f64>) -> Array1<f64> {
    let mean = features.sum_axis(Axis(1)) / features.ncols().max(1) as f64;
    for mut column in features.columns_mut() {
        column -= &mean;
    }
    mean
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_double_center_zero_sums() {
        let mut a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 9.0], [0.0, 1.0, 1.0]];
        double_center(&mut a);
        for s in a.sum_axis(Axis(0)).iter().chain(a.sum_axis(Axis(1)).iter()) {
            assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_center_observations() {
        let mut x = array![[1.0, 3.0], [2.0, 6.0]];
        let mean = center_observations(&mut x);
        assert_eq!(mean, array![2.0, 4.0]);
        assert_eq!(x, array![[-1.0, 1.0], [-2.0, 2.0]]);
    }

    #[test]
    fn test_conversions_preserve_layout() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let m = to_dmatrix(a.view());
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(to_array2(&m), a);

        let v = array![1.0, -2.0];
        assert_eq!(to_array1(&to_dvector(v.view())), v);
    }

    #[test]
    fn test_symmetrize() {
        let mut a = array![[1.0, 2.0], [4.0, 1.0]];
        symmetrize(&mut a);
        assert_eq!(a, array![[1.0, 3.0], [3.0, 1.0]]);
    }
}
