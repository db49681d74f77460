//! Eager kernels over vectors and matrices.
//!
//! Reductions accept any vector expression; contiguous SIMD-capable operands
//! go through the vector kernels, everything else through unrolled scalar
//! loops with independent partial accumulators. Multiplications materialize
//! their result (a product read element-by-element would re-multiply, so
//! lazy evaluation buys nothing there).

use crate::dense_matrix::DynamicMatrix;
use crate::dense_vector::DynamicVector;
use crate::expr::VecExpr;
use crate::scalar::Scalar;
use crate::sparse_matrix::CompressedMatrix;
use crate::sparse_vector::CompressedVector;
use crate::{simd, Error, Result};
use num_traits::Float;

/// Inner product of two vector expressions.
pub fn dot<A, B>(a: &A, b: &B) -> Result<A::Elem>
where
    A: VecExpr,
    B: VecExpr<Elem = A::Elem>,
{
    a.validate()?;
    b.validate()?;
    if a.len() != b.len() {
        return Err(Error::SizeMismatch(a.len(), b.len()));
    }
    if let (Some(x), Some(y)) = (a.as_slice(), b.as_slice()) {
        if let Some(r) = simd::try_dot(x, y) {
            return Ok(r);
        }
    }
    let n = a.len();
    let mut acc0 = A::Elem::zero();
    let mut acc1 = A::Elem::zero();
    let mut acc2 = A::Elem::zero();
    let mut acc3 = A::Elem::zero();
    let iend = n & !3usize;
    let mut i = 0;
    while i < iend {
        acc0 = acc0 + a.at(i) * b.at(i);
        acc1 = acc1 + a.at(i + 1) * b.at(i + 1);
        acc2 = acc2 + a.at(i + 2) * b.at(i + 2);
        acc3 = acc3 + a.at(i + 3) * b.at(i + 3);
        i += 4;
    }
    for k in iend..n {
        acc0 = acc0 + a.at(k) * b.at(k);
    }
    Ok(acc0 + acc1 + acc2 + acc3)
}

/// Sum of a vector expression's elements.
pub fn sum<A: VecExpr>(a: &A) -> Result<A::Elem> {
    a.validate()?;
    if let Some(x) = a.as_slice() {
        if let Some(r) = simd::try_sum(x) {
            return Ok(r);
        }
    }
    let n = a.len();
    let mut acc0 = A::Elem::zero();
    let mut acc1 = A::Elem::zero();
    let mut acc2 = A::Elem::zero();
    let mut acc3 = A::Elem::zero();
    let iend = n & !3usize;
    let mut i = 0;
    while i < iend {
        acc0 = acc0 + a.at(i);
        acc1 = acc1 + a.at(i + 1);
        acc2 = acc2 + a.at(i + 2);
        acc3 = acc3 + a.at(i + 3);
        i += 4;
    }
    for k in iend..n {
        acc0 = acc0 + a.at(k);
    }
    Ok(acc0 + acc1 + acc2 + acc3)
}

/// Squared Euclidean norm of a real vector expression.
pub fn norm_sqr<A: VecExpr>(a: &A) -> Result<A::Elem> {
    dot(a, a)
}

/// Euclidean norm of a real vector expression.
pub fn norm<A>(a: &A) -> Result<A::Elem>
where
    A: VecExpr,
    A::Elem: Float,
{
    Ok(norm_sqr(a)?.sqrt())
}

/// `y += alpha * x`.
pub fn axpy<T: Scalar>(y: &mut DynamicVector<T>, alpha: T, x: &DynamicVector<T>) -> Result<()> {
    if y.len() != x.len() {
        return Err(Error::SizeMismatch(y.len(), x.len()));
    }
    let ys = y.as_mut_slice();
    let xs = x.as_slice();
    if !simd::try_axpy(ys, xs, alpha) {
        for i in 0..ys.len() {
            ys[i] = ys[i] + alpha * xs[i];
        }
    }
    Ok(())
}

fn scalar_dot_slices<T: Scalar>(a: &[T], b: &[T]) -> T {
    let mut acc = T::zero();
    for i in 0..a.len() {
        acc = acc + a[i] * b[i];
    }
    acc
}

/// Dense matrix-vector product.
pub fn matvec<T: Scalar>(a: &DynamicMatrix<T>, x: &DynamicVector<T>) -> Result<DynamicVector<T>> {
    if a.columns() != x.len() {
        return Err(Error::SizeMismatch(a.columns(), x.len()));
    }
    let mut y = DynamicVector::zeros(a.rows());
    let xs = x.as_slice();
    for i in 0..a.rows() {
        let row = a.row_slice(i);
        y[i] = match simd::try_dot(row, xs) {
            Some(r) => r,
            None => scalar_dot_slices(row, xs),
        };
    }
    Ok(y)
}

/// Dense matrix-matrix product.
///
/// Walks `i, k, j` so the inner loop is an axpy over contiguous rows of `b`
/// and `c`, accumulating row `i` of the result in place.
pub fn matmul<T: Scalar>(a: &DynamicMatrix<T>, b: &DynamicMatrix<T>) -> Result<DynamicMatrix<T>> {
    if a.columns() != b.rows() {
        return Err(Error::ShapeMismatch {
            lhs_rows: a.rows(),
            lhs_cols: a.columns(),
            rhs_rows: b.rows(),
            rhs_cols: b.columns(),
        });
    }
    let mut c = DynamicMatrix::zeros(a.rows(), b.columns());
    for i in 0..a.rows() {
        for k in 0..a.columns() {
            let alpha = a[(i, k)];
            if alpha.is_zero() {
                continue;
            }
            let crow = c.row_slice_mut(i);
            let brow = b.row_slice(k);
            if !simd::try_axpy(crow, brow, alpha) {
                for j in 0..crow.len() {
                    crow[j] = crow[j] + alpha * brow[j];
                }
            }
        }
    }
    Ok(c)
}

/// Inner product of a sparse and a dense vector; only the stored pairs are
/// visited.
pub fn sparse_dot<T: Scalar>(s: &CompressedVector<T>, d: &DynamicVector<T>) -> Result<T> {
    if s.len() != d.len() {
        return Err(Error::SizeMismatch(s.len(), d.len()));
    }
    let mut acc = T::zero();
    for (i, v) in s.iter() {
        acc = acc + *v * d[i];
    }
    Ok(acc)
}

/// Sparse matrix-vector product over the stored pairs of each row.
pub fn sparse_matvec<T: Scalar>(
    a: &CompressedMatrix<T>,
    x: &DynamicVector<T>,
) -> Result<DynamicVector<T>> {
    if a.columns() != x.len() {
        return Err(Error::SizeMismatch(a.columns(), x.len()));
    }
    let mut y = DynamicVector::zeros(a.rows());
    for r in 0..a.rows() {
        let mut acc = T::zero();
        for (c, v) in a.row_iter(r) {
            acc = acc + *v * x[c];
        }
        y[r] = acc;
    }
    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn dot_matches_reference() {
        let a = DynamicVector::from_fn(53, |i| i as f64 * 0.25);
        let b = DynamicVector::from_fn(53, |i| 1.0 - i as f64 * 0.125);
        let expected: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        assert_relative_eq!(dot(&&a, &&b).unwrap(), expected, epsilon = 1e-10);
    }

    #[test]
    fn dot_over_expressions() {
        let a = DynamicVector::from_slice(&[1.0_f64, 2.0, 3.0]);
        let b = DynamicVector::from_slice(&[2.0_f64, 2.0, 2.0]);
        // (a + b) . a  =  3*1 + 4*2 + 5*3 = 26
        let r = dot(&(&a + &b), &&a).unwrap();
        assert_eq!(r, 26.0);
    }

    #[test]
    fn sum_and_norm() {
        let a = DynamicVector::from_slice(&[3.0_f64, 4.0]);
        assert_eq!(sum(&&a).unwrap(), 7.0);
        assert_eq!(norm_sqr(&&a).unwrap(), 25.0);
        assert_relative_eq!(norm(&&a).unwrap(), 5.0);
    }

    #[test]
    fn axpy_accumulates() {
        let x = DynamicVector::from_fn(11, |i| i as f64);
        let mut y = DynamicVector::from_elem(11, 1.0);
        axpy(&mut y, 2.0, &x).unwrap();
        for i in 0..11 {
            assert_eq!(y[i], 1.0 + 2.0 * i as f64);
        }
    }

    #[test]
    fn matvec_matches_reference() {
        let a = DynamicMatrix::from_fn(4, 3, |i, j| (i + 2 * j) as f64);
        let x = DynamicVector::from_slice(&[1.0_f64, -1.0, 2.0]);
        let y = matvec(&a, &x).unwrap();
        for i in 0..4 {
            let expected: f64 = (0..3).map(|j| a[(i, j)] * x[j]).sum();
            assert_eq!(y[i], expected);
        }
    }

    #[test]
    fn matmul_matches_reference() {
        let a = DynamicMatrix::from_fn(5, 7, |i, j| (i * 7 + j) as f64 * 0.5);
        let b = DynamicMatrix::from_fn(7, 4, |i, j| (i as f64) - (j as f64));
        let c = matmul(&a, &b).unwrap();
        for i in 0..5 {
            for j in 0..4 {
                let expected: f64 = (0..7).map(|k| a[(i, k)] * b[(k, j)]).sum();
                assert_relative_eq!(c[(i, j)], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn matmul_shape_mismatch() {
        let a = DynamicMatrix::<f64>::zeros(2, 3);
        let b = DynamicMatrix::<f64>::zeros(4, 2);
        assert!(matches!(matmul(&a, &b), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn sparse_products_visit_only_stored_pairs() {
        let mut s = CompressedVector::new(5);
        s.set(1, 2.0_f64);
        s.set(4, -1.0);
        let d = DynamicVector::from_fn(5, |i| (i + 1) as f64);
        assert_eq!(sparse_dot(&s, &d).unwrap(), 2.0 * 2.0 + -1.0 * 5.0);

        let m = CompressedMatrix::from_triplets(
            2,
            3,
            &[(0, 0, 1.0_f64), (0, 2, 2.0), (1, 1, 3.0)],
        )
        .unwrap();
        let x = DynamicVector::from_slice(&[1.0_f64, 2.0, 3.0]);
        let y = sparse_matvec(&m, &x).unwrap();
        assert_eq!(y.as_slice(), &[7.0, 6.0]);
    }
}
