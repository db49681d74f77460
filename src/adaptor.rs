//! Structure-enforcing matrix adaptors.
//!
//! Each adaptor owns a [`DynamicMatrix`] and guards every write so the
//! structural invariant can never be broken: symmetric writes mirror,
//! Hermitian writes mirror conjugated, diagonal adaptors reject off-diagonal
//! values. Construction from a general matrix validates the property up
//! front. All adaptors are expression leaves, so they compose with dense
//! matrices in arithmetic.

use crate::dense_matrix::DynamicMatrix;
use crate::expr::{MatExpr, Span};
use crate::scalar::{Conjugate, Scalar};
use crate::{Error, Result};

/// A square matrix with `a[(i, j)] == a[(j, i)]` enforced on every write.
#[derive(Clone, Debug, PartialEq)]
pub struct SymmetricMatrix<T: Scalar> {
    mat: DynamicMatrix<T>,
}

impl<T: Scalar> SymmetricMatrix<T> {
    /// An `n x n` zero matrix.
    pub fn new(n: usize) -> Self {
        Self {
            mat: DynamicMatrix::zeros(n, n),
        }
    }

    /// Adapt an existing matrix; it must be square and symmetric.
    pub fn from_matrix(mat: DynamicMatrix<T>) -> Result<Self> {
        check_square(&mat)?;
        for i in 0..mat.rows() {
            for j in i + 1..mat.columns() {
                if mat[(i, j)] != mat[(j, i)] {
                    return Err(Error::NotSymmetric { row: i, column: j });
                }
            }
        }
        Ok(Self { mat })
    }

    /// Matrix order (rows == columns).
    #[inline]
    pub fn order(&self) -> usize {
        self.mat.rows()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.mat[(i, j)]
    }

    /// Write `value` at `(i, j)` and its mirror position.
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.mat[(i, j)] = value;
        self.mat[(j, i)] = value;
    }

    /// Read-only access to the wrapped matrix.
    #[inline]
    pub fn matrix(&self) -> &DynamicMatrix<T> {
        &self.mat
    }

    pub fn into_inner(self) -> DynamicMatrix<T> {
        self.mat
    }

    /// Resize to `n x n`, preserving the top-left block if requested.
    pub fn resize(&mut self, n: usize, preserve: bool) {
        self.mat.resize(n, n, preserve);
    }
}

/// A square complex matrix with `a[(i, j)] == conj(a[(j, i)])` enforced on
/// every write.
#[derive(Clone, Debug, PartialEq)]
pub struct HermitianMatrix<T: Scalar + Conjugate> {
    mat: DynamicMatrix<T>,
}

impl<T: Scalar + Conjugate> HermitianMatrix<T> {
    /// An `n x n` zero matrix.
    pub fn new(n: usize) -> Self {
        Self {
            mat: DynamicMatrix::zeros(n, n),
        }
    }

    /// Adapt an existing matrix; it must be square and Hermitian.
    pub fn from_matrix(mat: DynamicMatrix<T>) -> Result<Self> {
        check_square(&mat)?;
        for i in 0..mat.rows() {
            for j in i..mat.columns() {
                if mat[(i, j)] != mat[(j, i)].conj() {
                    return Err(Error::NotHermitian { row: i, column: j });
                }
            }
        }
        Ok(Self { mat })
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.mat.rows()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.mat[(i, j)]
    }

    /// Write `value` at `(i, j)` and its conjugate at the mirror position.
    ///
    /// Diagonal values must be self-conjugate (real).
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        if i == j {
            if value != value.conj() {
                return Err(Error::InvalidDiagonal { index: i });
            }
            self.mat[(i, i)] = value;
            return Ok(());
        }
        self.mat[(i, j)] = value;
        self.mat[(j, i)] = value.conj();
        Ok(())
    }

    #[inline]
    pub fn matrix(&self) -> &DynamicMatrix<T> {
        &self.mat
    }

    pub fn into_inner(self) -> DynamicMatrix<T> {
        self.mat
    }

    pub fn resize(&mut self, n: usize, preserve: bool) {
        self.mat.resize(n, n, preserve);
    }
}

/// A square matrix whose off-diagonal elements are structurally zero.
#[derive(Clone, Debug, PartialEq)]
pub struct DiagonalMatrix<T: Scalar> {
    mat: DynamicMatrix<T>,
}

impl<T: Scalar> DiagonalMatrix<T> {
    /// An `n x n` zero matrix.
    pub fn new(n: usize) -> Self {
        Self {
            mat: DynamicMatrix::zeros(n, n),
        }
    }

    /// A diagonal matrix with the given diagonal.
    pub fn from_diagonal(diag: &[T]) -> Self {
        let mut out = Self::new(diag.len());
        for (i, &v) in diag.iter().enumerate() {
            out.mat[(i, i)] = v;
        }
        out
    }

    /// Adapt an existing matrix; it must be square with a zero off-diagonal.
    pub fn from_matrix(mat: DynamicMatrix<T>) -> Result<Self> {
        check_square(&mat)?;
        for i in 0..mat.rows() {
            for j in 0..mat.columns() {
                if i != j && !mat[(i, j)].is_zero() {
                    return Err(Error::NotDiagonal { row: i, column: j });
                }
            }
        }
        Ok(Self { mat })
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.mat.rows()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.mat[(i, j)]
    }

    /// Write `value` at `(i, j)`.
    ///
    /// A non-zero value off the diagonal is an invalid assignment.
    pub fn set(&mut self, i: usize, j: usize, value: T) -> Result<()> {
        if i != j {
            if !value.is_zero() {
                return Err(Error::RestrictedElement { row: i, column: j });
            }
            return Ok(());
        }
        self.mat[(i, i)] = value;
        Ok(())
    }

    #[inline]
    pub fn matrix(&self) -> &DynamicMatrix<T> {
        &self.mat
    }

    pub fn into_inner(self) -> DynamicMatrix<T> {
        self.mat
    }

    pub fn resize(&mut self, n: usize, preserve: bool) {
        self.mat.resize(n, n, preserve);
    }
}

fn check_square<T: Scalar>(mat: &DynamicMatrix<T>) -> Result<()> {
    if mat.rows() != mat.columns() {
        return Err(Error::NonSquare {
            rows: mat.rows(),
            cols: mat.columns(),
        });
    }
    Ok(())
}

macro_rules! adaptor_expr_leaf {
    ($( { $($g:tt)* } $ty:ty; )+) => {$(
        impl<$($g)*> MatExpr for $ty {
            type Elem = T;

            #[inline]
            fn rows(&self) -> usize {
                self.mat.rows()
            }

            #[inline]
            fn cols(&self) -> usize {
                self.mat.columns()
            }

            #[inline]
            fn at(&self, i: usize, j: usize) -> T {
                self.mat[(i, j)]
            }

            fn aliases(&self, span: Span) -> bool {
                span.overlaps(Span::of(self.mat.full()))
            }

            fn row_as_slice(&self, i: usize) -> Option<&[T]> {
                Some(self.mat.row_slice(i))
            }

            fn as_flat(&self) -> Option<&[T]> {
                Some(self.mat.full())
            }
        }
    )+};
}

adaptor_expr_leaf! {
    { 'a, T: Scalar } &'a SymmetricMatrix<T>;
    { 'a, T: Scalar + Conjugate } &'a HermitianMatrix<T>;
    { 'a, T: Scalar } &'a DiagonalMatrix<T>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn symmetric_set_mirrors() {
        let mut s = SymmetricMatrix::new(3);
        s.set(0, 2, 5.0_f64);
        assert_eq!(s.get(0, 2), 5.0);
        assert_eq!(s.get(2, 0), 5.0);
    }

    #[test]
    fn symmetric_from_matrix_validates() {
        let mut m = DynamicMatrix::<f64>::zeros(2, 2);
        m[(0, 1)] = 1.0;
        assert!(matches!(
            SymmetricMatrix::from_matrix(m),
            Err(Error::NotSymmetric { row: 0, column: 1 })
        ));
        let rect = DynamicMatrix::<f64>::zeros(2, 3);
        assert!(matches!(
            SymmetricMatrix::from_matrix(rect),
            Err(Error::NonSquare { rows: 2, cols: 3 })
        ));
    }

    #[test]
    fn hermitian_set_writes_conjugate_mirror() {
        let mut h = HermitianMatrix::new(2);
        h.set(0, 1, Complex64::new(1.0, 2.0)).unwrap();
        assert_eq!(h.get(1, 0), Complex64::new(1.0, -2.0));
    }

    #[test]
    fn hermitian_diagonal_must_be_real() {
        let mut h = HermitianMatrix::new(2);
        assert!(matches!(
            h.set(1, 1, Complex64::new(0.0, 3.0)),
            Err(Error::InvalidDiagonal { index: 1 })
        ));
        h.set(1, 1, Complex64::new(4.0, 0.0)).unwrap();
        assert_eq!(h.get(1, 1), Complex64::new(4.0, 0.0));
    }

    #[test]
    fn diagonal_rejects_off_diagonal_writes() {
        let mut d = DiagonalMatrix::new(3);
        d.set(1, 1, 2.0_f64).unwrap();
        // Writing an explicit zero off the diagonal is a no-op, not an error.
        d.set(0, 1, 0.0).unwrap();
        assert!(matches!(
            d.set(0, 1, 1.0),
            Err(Error::RestrictedElement { row: 0, column: 1 })
        ));
        assert_eq!(d.get(1, 1), 2.0);
    }

    #[test]
    fn adaptors_compose_with_expressions() {
        let d = DiagonalMatrix::from_diagonal(&[1.0_f64, 2.0]);
        let m = DynamicMatrix::from_fn(2, 2, |i, j| (i + j) as f64);
        let sum = (&m + &d).eval().unwrap();
        assert_eq!(sum[(0, 0)], 1.0);
        assert_eq!(sum[(1, 1)], 4.0);
        assert_eq!(sum[(0, 1)], 1.0);
    }
}
