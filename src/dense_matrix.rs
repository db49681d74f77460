//! Owned dense matrix, row-major with padded row spacing.

use crate::expr::{MatExpr, Span};
use crate::memory::{padded_len, AlignedVec};
use crate::scalar::Scalar;
use crate::sparse_matrix::CompressedMatrix;
use crate::view::{Column, ColumnMut, Row, RowMut, Submatrix, SubmatrixMut};
use crate::{assign, simd, Error, Result};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use rand_distr::StandardNormal;

const TRANSPOSE_TILE: usize = 16;

/// A heap-allocated row-major matrix of `T`.
///
/// Each row occupies `spacing = padded_len(columns)` elements of the backing
/// buffer, so every row starts cache-line aligned and the tail of each row is
/// zero padding. Elementwise kernels may therefore run over the whole flat
/// buffer in a single pass.
#[derive(Clone)]
pub struct DynamicMatrix<T: Scalar> {
    rows: usize,
    cols: usize,
    spacing: usize,
    data: AlignedVec<T>,
}

impl<T: Scalar> DynamicMatrix<T> {
    /// An empty matrix; no allocation.
    pub fn new() -> Self {
        Self {
            rows: 0,
            cols: 0,
            spacing: 0,
            data: AlignedVec::new(),
        }
    }

    /// An `m x n` matrix of zeros.
    pub fn zeros(m: usize, n: usize) -> Self {
        let spacing = padded_len::<T>(n);
        Self {
            rows: m,
            cols: n,
            spacing,
            data: AlignedVec::zeroed(m.checked_mul(spacing).expect("capacity overflow")),
        }
    }

    /// Element `(i, j)` is `f(i, j)`.
    pub fn from_fn(m: usize, n: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut out = Self::zeros(m, n);
        for i in 0..m {
            for (j, x) in out.row_slice_mut(i).iter_mut().enumerate() {
                *x = f(i, j);
            }
        }
        out
    }

    /// Row-major copy construction; `values.len()` must be `m * n`.
    pub fn from_row_slice(m: usize, n: usize, values: &[T]) -> Result<Self> {
        if values.len() != m * n {
            return Err(Error::SizeMismatch(values.len(), m * n));
        }
        Ok(Self::from_fn(m, n, |i, j| values[i * n + j]))
    }

    /// Uniformly random elements.
    pub fn random<R: Rng>(m: usize, n: usize, rng: &mut R) -> Self
    where
        Standard: Distribution<T>,
    {
        Self::from_fn(m, n, |_, _| rng.gen())
    }

    /// Standard-normal random elements.
    pub fn random_normal<R: Rng>(m: usize, n: usize, rng: &mut R) -> Self
    where
        StandardNormal: Distribution<T>,
    {
        Self::from_fn(m, n, |_, _| StandardNormal.sample(rng))
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.cols
    }

    /// Padded width of one row in the backing buffer.
    #[inline]
    pub fn spacing(&self) -> usize {
        self.spacing
    }

    /// Capacity of the backing buffer in elements.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    #[inline]
    fn used(&self) -> usize {
        self.rows * self.spacing
    }

    /// The used backing region, padding included.
    #[inline]
    pub(crate) fn full(&self) -> &[T] {
        &self.data.as_slice()[..self.rows * self.spacing]
    }

    /// The used backing region, padding included, mutable.
    #[inline]
    pub(crate) fn full_mut(&mut self) -> &mut [T] {
        let used = self.used();
        &mut self.data.as_mut_slice()[..used]
    }

    /// The logical elements of row `i`.
    #[inline]
    pub fn row_slice(&self, i: usize) -> &[T] {
        assert!(i < self.rows, "row index out of bounds");
        &self.data.as_slice()[i * self.spacing..i * self.spacing + self.cols]
    }

    /// The logical elements of row `i`, mutable.
    #[inline]
    pub fn row_slice_mut(&mut self, i: usize) -> &mut [T] {
        assert!(i < self.rows, "row index out of bounds");
        let start = i * self.spacing;
        let cols = self.cols;
        &mut self.data.as_mut_slice()[start..start + cols]
    }

    /// Grow the backing capacity to at least `elements`.
    pub fn reserve(&mut self, elements: usize) {
        let used = self.used();
        self.data.grow_zeroed(elements, used);
    }

    /// Change the shape to `m x n`.
    ///
    /// With `preserve` the overlapping top-left block survives; without it
    /// all elements are zero afterwards.
    pub fn resize(&mut self, m: usize, n: usize, preserve: bool) {
        if m == self.rows && n == self.cols {
            return;
        }
        let spacing = padded_len::<T>(n);
        let mut data = AlignedVec::zeroed(m.checked_mul(spacing).expect("capacity overflow"));
        if preserve {
            let keep_rows = m.min(self.rows);
            let keep_cols = n.min(self.cols);
            for i in 0..keep_rows {
                let src = &self.data.as_slice()[i * self.spacing..i * self.spacing + keep_cols];
                data.as_mut_slice()[i * spacing..i * spacing + keep_cols].copy_from_slice(src);
            }
        }
        self.rows = m;
        self.cols = n;
        self.spacing = spacing;
        self.data = data;
    }

    /// Zero every element, keeping the shape.
    pub fn reset(&mut self) {
        assign::fill_zero(self.full_mut());
    }

    /// Number of non-zero logical elements.
    pub fn nonzeros(&self) -> usize {
        (0..self.rows)
            .map(|i| self.row_slice(i).iter().filter(|v| !v.is_zero()).count())
            .sum()
    }

    /// Eager transpose into a new matrix, tiled for cache locality.
    pub fn transpose(&self) -> DynamicMatrix<T> {
        let mut out = Self::zeros(self.cols, self.rows);
        for ii in (0..self.rows).step_by(TRANSPOSE_TILE) {
            for jj in (0..self.cols).step_by(TRANSPOSE_TILE) {
                let imax = (ii + TRANSPOSE_TILE).min(self.rows);
                let jmax = (jj + TRANSPOSE_TILE).min(self.cols);
                for i in ii..imax {
                    let src = self.row_slice(i);
                    for j in jj..jmax {
                        out.data.as_mut_slice()[j * out.spacing + i] = src[j];
                    }
                }
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    fn check_block(&self, row: usize, col: usize, m: usize, n: usize) -> Result<()> {
        let row_end = row.checked_add(m);
        let col_end = col.checked_add(n);
        match (row_end, col_end) {
            (Some(re), Some(ce)) if re <= self.rows && ce <= self.cols => Ok(()),
            _ => Err(Error::InvalidSubmatrix {
                row,
                column: col,
                rows: m,
                columns: n,
                owner_rows: self.rows,
                owner_columns: self.cols,
            }),
        }
    }

    fn window_range(&self, row: usize, col: usize, m: usize, n: usize) -> std::ops::Range<usize> {
        if m == 0 || n == 0 {
            return 0..0;
        }
        let start = row * self.spacing + col;
        start..start + (m - 1) * self.spacing + n
    }

    /// An `m x n` window with origin `(row, col)`.
    pub fn submatrix(&self, row: usize, col: usize, m: usize, n: usize) -> Result<Submatrix<'_, T>> {
        self.check_block(row, col, m, n)?;
        let range = self.window_range(row, col, m, n);
        Ok(Submatrix::new(
            &self.data.as_slice()[range],
            self.spacing,
            m,
            n,
        ))
    }

    /// A mutable `m x n` window with origin `(row, col)`.
    pub fn submatrix_mut(
        &mut self,
        row: usize,
        col: usize,
        m: usize,
        n: usize,
    ) -> Result<SubmatrixMut<'_, T>> {
        self.check_block(row, col, m, n)?;
        let range = self.window_range(row, col, m, n);
        let spacing = self.spacing;
        Ok(SubmatrixMut::new(
            &mut self.data.as_mut_slice()[range],
            spacing,
            m,
            n,
        ))
    }

    /// Row `i` as a view.
    pub fn row(&self, i: usize) -> Result<Row<'_, T>> {
        if i >= self.rows {
            return Err(Error::InvalidIndex {
                index: i,
                extent: self.rows,
            });
        }
        Ok(Row::new(self.row_slice(i)))
    }

    /// Row `i` as a mutable view.
    pub fn row_mut(&mut self, i: usize) -> Result<RowMut<'_, T>> {
        if i >= self.rows {
            return Err(Error::InvalidIndex {
                index: i,
                extent: self.rows,
            });
        }
        Ok(RowMut::new(self.row_slice_mut(i)))
    }

    /// Column `j` as a strided view.
    pub fn column(&self, j: usize) -> Result<Column<'_, T>> {
        if j >= self.cols {
            return Err(Error::InvalidIndex {
                index: j,
                extent: self.cols,
            });
        }
        let range = self.window_range(0, j, self.rows, 1);
        Ok(Column::new(
            &self.data.as_slice()[range],
            self.spacing,
            self.rows,
        ))
    }

    /// Column `j` as a mutable strided view.
    pub fn column_mut(&mut self, j: usize) -> Result<ColumnMut<'_, T>> {
        if j >= self.cols {
            return Err(Error::InvalidIndex {
                index: j,
                extent: self.cols,
            });
        }
        let range = self.window_range(0, j, self.rows, 1);
        let spacing = self.spacing;
        Ok(ColumnMut::new(
            &mut self.data.as_mut_slice()[range],
            spacing,
            self.rows,
        ))
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    /// `self = expr`, resizing to the expression's shape.
    pub fn assign<E: MatExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        expr.validate()?;
        if self.rows != expr.rows() || self.cols != expr.cols() {
            self.resize(expr.rows(), expr.cols(), false);
        }
        let span = Span::of(self.full());
        if expr.aliases(span) {
            let tmp = assign::materialize_mat(expr);
            assign::copy_dense(self.full_mut(), tmp.full());
            return Ok(());
        }
        if let Some(src) = expr.as_flat() {
            if src.len() == self.used() {
                assign::copy_dense(self.full_mut(), src);
                return Ok(());
            }
        }
        if expr.try_assign_flat_simd(self.full_mut()) {
            return Ok(());
        }
        let (spacing, rows, cols) = (self.spacing, self.rows, self.cols);
        assign::assign_mat(self.full_mut(), spacing, rows, cols, expr)
    }

    /// `self += expr`; shapes must match.
    pub fn add_assign_expr<E: MatExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        self.compound_flat(expr, simd::try_add_assign, assign::add_assign_mat)
    }

    /// `self -= expr`; shapes must match.
    pub fn sub_assign_expr<E: MatExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        self.compound_flat(expr, simd::try_sub_assign, assign::sub_assign_mat)
    }

    /// Elementwise `self *= expr`; shapes must match.
    pub fn mul_assign_expr<E: MatExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        self.compound_flat(expr, simd::try_mul_assign, assign::mul_assign_mat)
    }

    fn compound_flat<E: MatExpr<Elem = T>>(
        &mut self,
        expr: &E,
        probe: fn(&mut [T], &[T]) -> bool,
        general: fn(&mut [T], usize, usize, usize, &E) -> Result<()>,
    ) -> Result<()> {
        expr.validate()?;
        if self.rows != expr.rows() || self.cols != expr.cols() {
            return Err(Error::ShapeMismatch {
                lhs_rows: self.rows,
                lhs_cols: self.cols,
                rhs_rows: expr.rows(),
                rhs_cols: expr.cols(),
            });
        }
        let span = Span::of(self.full());
        if !expr.aliases(span) {
            if let Some(src) = expr.as_flat() {
                if src.len() == self.used() && probe(self.full_mut(), src) {
                    return Ok(());
                }
            }
        }
        let (spacing, rows, cols) = (self.spacing, self.rows, self.cols);
        general(self.full_mut(), spacing, rows, cols, expr)
    }

    /// `self = sparse`, resizing to the sparse matrix's shape.
    pub fn assign_sparse(&mut self, rhs: &CompressedMatrix<T>) {
        if self.rows != rhs.rows() || self.cols != rhs.columns() {
            self.resize(rhs.rows(), rhs.columns(), false);
        }
        let (spacing, rows, cols) = (self.spacing, self.rows, self.cols);
        assign::assign_sparse_mat(self.full_mut(), spacing, rows, cols, rhs);
    }

    /// `self += sparse`; shapes must match.
    pub fn add_assign_sparse(&mut self, rhs: &CompressedMatrix<T>) -> Result<()> {
        self.check_sparse_shape(rhs)?;
        let (spacing, rows, cols) = (self.spacing, self.rows, self.cols);
        assign::add_assign_sparse_mat(self.full_mut(), spacing, rows, cols, rhs);
        Ok(())
    }

    /// `self -= sparse`; shapes must match.
    pub fn sub_assign_sparse(&mut self, rhs: &CompressedMatrix<T>) -> Result<()> {
        self.check_sparse_shape(rhs)?;
        let (spacing, rows, cols) = (self.spacing, self.rows, self.cols);
        assign::sub_assign_sparse_mat(self.full_mut(), spacing, rows, cols, rhs);
        Ok(())
    }

    fn check_sparse_shape(&self, rhs: &CompressedMatrix<T>) -> Result<()> {
        if self.rows != rhs.rows() || self.cols != rhs.columns() {
            return Err(Error::ShapeMismatch {
                lhs_rows: self.rows,
                lhs_cols: self.cols,
                rhs_rows: rhs.rows(),
                rhs_cols: rhs.columns(),
            });
        }
        Ok(())
    }

    /// Copy an `m x n` block with origin `src` to origin `dst` inside this
    /// matrix.
    ///
    /// Overlapping blocks detour through a temporary, exactly like an
    /// aliased expression assignment.
    pub fn copy_submatrix(
        &mut self,
        src: (usize, usize),
        dst: (usize, usize),
        m: usize,
        n: usize,
    ) -> Result<()> {
        self.check_block(src.0, src.1, m, n)?;
        self.check_block(dst.0, dst.1, m, n)?;
        if m == 0 || n == 0 || src == dst {
            return Ok(());
        }
        let rows_overlap = src.0 < dst.0 + m && dst.0 < src.0 + m;
        let cols_overlap = src.1 < dst.1 + n && dst.1 < src.1 + n;
        if rows_overlap && cols_overlap {
            let tmp = {
                let window = self.submatrix(src.0, src.1, m, n)?;
                assign::materialize_mat(&window)
            };
            for i in 0..m {
                let start = (dst.0 + i) * self.spacing + dst.1;
                self.data.as_mut_slice()[start..start + n].copy_from_slice(tmp.row_slice(i));
            }
            return Ok(());
        }
        // Disjoint blocks never share elements; copy row pairs via raw parts.
        let spacing = self.spacing;
        let base = self.data.as_mut_slice().as_mut_ptr();
        for i in 0..m {
            let s = (src.0 + i) * spacing + src.1;
            let d = (dst.0 + i) * spacing + dst.1;
            unsafe {
                let src_row = std::slice::from_raw_parts(base.add(s), n);
                let dst_row = std::slice::from_raw_parts_mut(base.add(d), n);
                dst_row.copy_from_slice(src_row);
            }
        }
        Ok(())
    }
}

impl<T: Scalar> Default for DynamicMatrix<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> PartialEq for DynamicMatrix<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.rows != other.rows || self.cols != other.cols {
            return false;
        }
        (0..self.rows).all(|i| self.row_slice(i) == other.row_slice(i))
    }
}

impl<T: Scalar> std::fmt::Debug for DynamicMatrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries((0..self.rows).map(|i| self.row_slice(i)))
            .finish()
    }
}

impl<T: Scalar> std::ops::Index<(usize, usize)> for DynamicMatrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(i < self.rows && j < self.cols, "index out of bounds");
        &self.data.as_slice()[i * self.spacing + j]
    }
}

impl<T: Scalar> std::ops::IndexMut<(usize, usize)> for DynamicMatrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(i < self.rows && j < self.cols, "index out of bounds");
        &mut self.data.as_mut_slice()[i * self.spacing + j]
    }
}

impl<'a, T: Scalar> MatExpr for &'a DynamicMatrix<T> {
    type Elem = T;

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> T {
        self.data.as_slice()[i * self.spacing + j]
    }

    fn aliases(&self, span: Span) -> bool {
        span.overlaps(Span::of(DynamicMatrix::full(self)))
    }

    fn row_as_slice(&self, i: usize) -> Option<&[T]> {
        Some(DynamicMatrix::row_slice(self, i))
    }

    fn as_flat(&self) -> Option<&[T]> {
        Some(DynamicMatrix::full(self))
    }
}
