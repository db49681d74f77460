//! The assignment engine.
//!
//! Every `lhs = expr` in the crate funnels through here and follows one
//! protocol, in order:
//!
//! 1. Validate the expression tree, then check its extent against the
//!    destination.
//! 2. Alias test: compare the destination's raw address range against every
//!    leaf of the expression. Overlap means the expression may read what the
//!    assignment writes, so it is evaluated into a temporary first and the
//!    temporary is copied back.
//! 3. Dispatch: contiguous copies go through `memcpy`, upgraded to
//!    non-temporal streaming stores past the cache threshold (the
//!    destination is un-aliased on this branch by construction); binary
//!    nodes over SIMD-compatible contiguous operands go through the vector
//!    kernels; everything else runs the fused scalar loop, unrolled by four
//!    (two for compound assignment).
//! 4. Sparse right-hand sides skip the dense walk: straight assignment
//!    zero-fills and scatters the stored pairs, compound assignment merges
//!    them.
//!
//! `LINFUSE_TRACE=1` logs the chosen path.

use crate::dense_vector::DynamicVector;
use crate::expr::{MatExpr, Span, VecExpr};
use crate::scalar::Scalar;
use crate::sparse_matrix::CompressedMatrix;
use crate::sparse_vector::CompressedVector;
use crate::{simd, Error, Result, CACHE_SIZE};

fn trace_enabled() -> bool {
    matches!(std::env::var("LINFUSE_TRACE"), Ok(ref v) if v == "1")
}

fn trace(path: &str, elems: usize) {
    if trace_enabled() {
        eprintln!("[linfuse] {path} ({elems} elems)");
    }
}

/// Whether a destination of `len` elements exceeds the streaming threshold.
///
/// The factor of three accounts for the destination plus two source operands
/// competing for the same cache.
#[inline]
pub(crate) fn exceeds_cache<T>(len: usize) -> bool {
    len.saturating_mul(3)
        .saturating_mul(std::mem::size_of::<T>())
        > CACHE_SIZE
}

/// Contiguous copy; the caller guarantees `dst` is not aliased by `src`.
pub(crate) fn copy_dense<T: Scalar>(dst: &mut [T], src: &[T]) {
    if exceeds_cache::<T>(dst.len()) && simd::try_stream_copy(dst, src) {
        trace("copy: stream", dst.len());
    } else {
        dst.copy_from_slice(src);
    }
}

/// Zero-fill, streaming past the cache threshold.
pub(crate) fn fill_zero<T: Scalar>(dst: &mut [T]) {
    if exceeds_cache::<T>(dst.len()) && simd::try_stream_fill_zero(dst) {
        trace("fill: stream", dst.len());
    } else {
        dst.fill(T::zero());
    }
}

// ============================================================================
// Vector assignment
// ============================================================================

/// `dst = expr` over a contiguous destination of matching length.
pub(crate) fn assign_vec<E: VecExpr>(dst: &mut [E::Elem], expr: &E) -> Result<()> {
    expr.validate()?;
    if expr.len() != dst.len() {
        return Err(Error::SizeMismatch(dst.len(), expr.len()));
    }
    if expr.aliases(Span::of(dst)) {
        let tmp = materialize_vec(expr);
        trace("assign: alias temp", dst.len());
        copy_dense(dst, tmp.as_slice());
        return Ok(());
    }
    if let Some(src) = expr.as_slice() {
        copy_dense(dst, src);
        return Ok(());
    }
    if expr.try_assign_simd(dst) {
        trace("assign: simd", dst.len());
        return Ok(());
    }
    trace("assign: scalar", dst.len());
    scalar_assign(dst, expr);
    Ok(())
}

/// Evaluate into fresh storage. The result cannot alias anything.
pub(crate) fn materialize_vec<E: VecExpr>(expr: &E) -> DynamicVector<E::Elem> {
    let mut tmp = DynamicVector::zeros(expr.len());
    let dst = tmp.as_mut_slice();
    if let Some(src) = expr.as_slice() {
        dst.copy_from_slice(src);
    } else if !expr.try_assign_simd(dst) {
        scalar_assign(dst, expr);
    }
    tmp
}

/// Fused single-pass scalar loop, unrolled by four.
fn scalar_assign<E: VecExpr>(dst: &mut [E::Elem], expr: &E) {
    let n = dst.len();
    let iend = n & !3usize;
    let mut i = 0;
    while i < iend {
        dst[i] = expr.at(i);
        dst[i + 1] = expr.at(i + 1);
        dst[i + 2] = expr.at(i + 2);
        dst[i + 3] = expr.at(i + 3);
        i += 4;
    }
    for k in iend..n {
        dst[k] = expr.at(k);
    }
}

macro_rules! compound_vec_fn {
    ($name:ident, $sop:tt, $probe:ident, $label:literal) => {
        /// Compound assignment over a contiguous destination.
        pub(crate) fn $name<E: VecExpr>(dst: &mut [E::Elem], expr: &E) -> Result<()> {
            expr.validate()?;
            if expr.len() != dst.len() {
                return Err(Error::SizeMismatch(dst.len(), expr.len()));
            }
            if expr.aliases(Span::of(dst)) {
                let tmp = materialize_vec(expr);
                let s = tmp.as_slice();
                trace(concat!($label, ": alias temp"), dst.len());
                if !simd::$probe(dst, s) {
                    for i in 0..dst.len() {
                        dst[i] = dst[i] $sop s[i];
                    }
                }
                return Ok(());
            }
            if let Some(src) = expr.as_slice() {
                if simd::$probe(dst, src) {
                    trace(concat!($label, ": simd"), dst.len());
                    return Ok(());
                }
            }
            trace(concat!($label, ": scalar"), dst.len());
            let n = dst.len();
            let iend = n & !1usize;
            let mut i = 0;
            while i < iend {
                dst[i] = dst[i] $sop expr.at(i);
                dst[i + 1] = dst[i + 1] $sop expr.at(i + 1);
                i += 2;
            }
            if iend < n {
                dst[iend] = dst[iend] $sop expr.at(iend);
            }
            Ok(())
        }
    };
}

compound_vec_fn!(add_assign_vec, +, try_add_assign, "add-assign");
compound_vec_fn!(sub_assign_vec, -, try_sub_assign, "sub-assign");
compound_vec_fn!(mul_assign_vec, *, try_mul_assign, "mul-assign");

/// `dst = expr` over a strided destination (matrix column).
pub(crate) fn assign_vec_strided<E: VecExpr>(
    data: &mut [E::Elem],
    stride: usize,
    len: usize,
    expr: &E,
) -> Result<()> {
    expr.validate()?;
    if expr.len() != len {
        return Err(Error::SizeMismatch(len, expr.len()));
    }
    if expr.aliases(Span::of(data)) {
        let tmp = materialize_vec(expr);
        let s = tmp.as_slice();
        trace("assign strided: alias temp", len);
        for i in 0..len {
            data[i * stride] = s[i];
        }
        return Ok(());
    }
    for i in 0..len {
        data[i * stride] = expr.at(i);
    }
    Ok(())
}

/// Compound assignment over a strided destination.
pub(crate) fn compound_vec_strided<E: VecExpr>(
    data: &mut [E::Elem],
    stride: usize,
    len: usize,
    expr: &E,
    op: impl Fn(E::Elem, E::Elem) -> E::Elem,
) -> Result<()> {
    expr.validate()?;
    if expr.len() != len {
        return Err(Error::SizeMismatch(len, expr.len()));
    }
    if expr.aliases(Span::of(data)) {
        let tmp = materialize_vec(expr);
        let s = tmp.as_slice();
        for i in 0..len {
            data[i * stride] = op(data[i * stride], s[i]);
        }
        return Ok(());
    }
    for i in 0..len {
        data[i * stride] = op(data[i * stride], expr.at(i));
    }
    Ok(())
}

// ============================================================================
// Matrix assignment
// ============================================================================

/// `dst = expr` over a row-strided destination window of matching shape.
///
/// `data` starts at the window origin; row `i` occupies
/// `data[i * spacing .. i * spacing + cols]`.
pub(crate) fn assign_mat<E: MatExpr>(
    data: &mut [E::Elem],
    spacing: usize,
    rows: usize,
    cols: usize,
    expr: &E,
) -> Result<()> {
    expr.validate()?;
    if expr.rows() != rows || expr.cols() != cols {
        return Err(Error::ShapeMismatch {
            lhs_rows: rows,
            lhs_cols: cols,
            rhs_rows: expr.rows(),
            rhs_cols: expr.cols(),
        });
    }
    if rows == 0 || cols == 0 {
        return Ok(());
    }
    if expr.aliases(Span::of(data)) {
        let tmp = materialize_mat(expr);
        trace("assign mat: alias temp", rows * cols);
        for i in 0..rows {
            let dst_row = &mut data[i * spacing..i * spacing + cols];
            copy_dense(dst_row, tmp.row_slice(i));
        }
        return Ok(());
    }
    for i in 0..rows {
        let dst_row = &mut data[i * spacing..i * spacing + cols];
        if let Some(src) = expr.row_as_slice(i) {
            dst_row.copy_from_slice(src);
        } else if !expr.try_assign_row_simd(i, dst_row) {
            scalar_assign_row(dst_row, expr, i);
        }
    }
    Ok(())
}

/// Evaluate into a fresh matrix. The result cannot alias anything.
pub(crate) fn materialize_mat<E: MatExpr>(expr: &E) -> crate::DynamicMatrix<E::Elem> {
    let mut tmp = crate::DynamicMatrix::zeros(expr.rows(), expr.cols());
    if expr.try_assign_flat_simd(tmp.full_mut()) {
        return tmp;
    }
    let (rows, cols, spacing) = (tmp.rows(), tmp.columns(), tmp.spacing());
    let data = tmp.full_mut();
    for i in 0..rows {
        let dst_row = &mut data[i * spacing..i * spacing + cols];
        if let Some(src) = expr.row_as_slice(i) {
            dst_row.copy_from_slice(src);
        } else if !expr.try_assign_row_simd(i, dst_row) {
            scalar_assign_row(dst_row, expr, i);
        }
    }
    tmp
}

fn scalar_assign_row<E: MatExpr>(dst: &mut [E::Elem], expr: &E, i: usize) {
    let n = dst.len();
    let jend = n & !3usize;
    let mut j = 0;
    while j < jend {
        dst[j] = expr.at(i, j);
        dst[j + 1] = expr.at(i, j + 1);
        dst[j + 2] = expr.at(i, j + 2);
        dst[j + 3] = expr.at(i, j + 3);
        j += 4;
    }
    for k in jend..n {
        dst[k] = expr.at(i, k);
    }
}

macro_rules! compound_mat_fn {
    ($name:ident, $sop:tt, $probe:ident, $label:literal) => {
        /// Compound assignment over a row-strided destination window.
        pub(crate) fn $name<E: MatExpr>(
            data: &mut [E::Elem],
            spacing: usize,
            rows: usize,
            cols: usize,
            expr: &E,
        ) -> Result<()> {
            expr.validate()?;
            if expr.rows() != rows || expr.cols() != cols {
                return Err(Error::ShapeMismatch {
                    lhs_rows: rows,
                    lhs_cols: cols,
                    rhs_rows: expr.rows(),
                    rhs_cols: expr.cols(),
                });
            }
            if rows == 0 || cols == 0 {
                return Ok(());
            }
            if expr.aliases(Span::of(data)) {
                let tmp = materialize_mat(expr);
                trace(concat!($label, " mat: alias temp"), rows * cols);
                for i in 0..rows {
                    let dst_row = &mut data[i * spacing..i * spacing + cols];
                    let s = tmp.row_slice(i);
                    if !simd::$probe(dst_row, s) {
                        for j in 0..cols {
                            dst_row[j] = dst_row[j] $sop s[j];
                        }
                    }
                }
                return Ok(());
            }
            for i in 0..rows {
                let dst_row = &mut data[i * spacing..i * spacing + cols];
                if let Some(src) = expr.row_as_slice(i) {
                    if simd::$probe(dst_row, src) {
                        continue;
                    }
                }
                let jend = cols & !1usize;
                let mut j = 0;
                while j < jend {
                    dst_row[j] = dst_row[j] $sop expr.at(i, j);
                    dst_row[j + 1] = dst_row[j + 1] $sop expr.at(i, j + 1);
                    j += 2;
                }
                if jend < cols {
                    dst_row[jend] = dst_row[jend] $sop expr.at(i, jend);
                }
            }
            Ok(())
        }
    };
}

compound_mat_fn!(add_assign_mat, +, try_add_assign, "add-assign");
compound_mat_fn!(sub_assign_mat, -, try_sub_assign, "sub-assign");
compound_mat_fn!(mul_assign_mat, *, try_mul_assign, "mul-assign");

// ============================================================================
// Sparse right-hand sides
// ============================================================================

/// `dst = sparse`: zero-fill, then scatter the stored pairs.
pub(crate) fn assign_sparse_vec<T: Scalar>(dst: &mut [T], rhs: &CompressedVector<T>) {
    debug_assert_eq!(dst.len(), rhs.len());
    trace("assign: sparse scatter", rhs.nonzeros());
    fill_zero(dst);
    for (i, v) in rhs.iter() {
        dst[i] = *v;
    }
}

/// `dst += sparse`: merge only the stored pairs.
pub(crate) fn add_assign_sparse_vec<T: Scalar>(dst: &mut [T], rhs: &CompressedVector<T>) {
    debug_assert_eq!(dst.len(), rhs.len());
    for (i, v) in rhs.iter() {
        dst[i] = dst[i] + *v;
    }
}

/// `dst -= sparse`: merge only the stored pairs.
pub(crate) fn sub_assign_sparse_vec<T: Scalar>(dst: &mut [T], rhs: &CompressedVector<T>) {
    debug_assert_eq!(dst.len(), rhs.len());
    for (i, v) in rhs.iter() {
        dst[i] = dst[i] - *v;
    }
}

/// `dst = sparse` over a row-strided window.
pub(crate) fn assign_sparse_mat<T: Scalar>(
    data: &mut [T],
    spacing: usize,
    rows: usize,
    cols: usize,
    rhs: &CompressedMatrix<T>,
) {
    debug_assert_eq!(rows, rhs.rows());
    debug_assert_eq!(cols, rhs.columns());
    trace("assign mat: sparse scatter", rhs.nonzeros());
    for r in 0..rows {
        let row = &mut data[r * spacing..r * spacing + cols];
        fill_zero(row);
        for (c, v) in rhs.row_iter(r) {
            row[c] = *v;
        }
    }
}

/// `dst += sparse` over a row-strided window.
pub(crate) fn add_assign_sparse_mat<T: Scalar>(
    data: &mut [T],
    spacing: usize,
    rows: usize,
    cols: usize,
    rhs: &CompressedMatrix<T>,
) {
    debug_assert_eq!(rows, rhs.rows());
    debug_assert_eq!(cols, rhs.columns());
    for r in 0..rows {
        let row = &mut data[r * spacing..r * spacing + cols];
        for (c, v) in rhs.row_iter(r) {
            row[c] = row[c] + *v;
        }
    }
}

/// `dst -= sparse` over a row-strided window.
pub(crate) fn sub_assign_sparse_mat<T: Scalar>(
    data: &mut [T],
    spacing: usize,
    rows: usize,
    cols: usize,
    rhs: &CompressedMatrix<T>,
) {
    debug_assert_eq!(rows, rhs.rows());
    debug_assert_eq!(cols, rhs.columns());
    for r in 0..rows {
        let row = &mut data[r * spacing..r * spacing + cols];
        for (c, v) in rhs.row_iter(r) {
            row[c] = row[c] - *v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeds_cache_threshold() {
        assert!(!exceeds_cache::<f64>(1000));
        // 3 * len * 8 bytes > 3 MiB  =>  len > 131072
        assert!(exceeds_cache::<f64>(140_000));
    }

    #[test]
    fn assign_rejects_length_mismatch() {
        let a = DynamicVector::from_slice(&[1.0_f64, 2.0, 3.0]);
        let mut dst = [0.0_f64; 2];
        let err = assign_vec(&mut dst, &&a).unwrap_err();
        assert!(matches!(err, Error::SizeMismatch(2, 3)));
    }

    #[test]
    fn scalar_fallback_handles_ragged_tail() {
        let a = DynamicVector::from_fn(7, |i| i as f64);
        let b = DynamicVector::from_fn(7, |i| 10.0 * i as f64);
        let mut dst = [0.0_f64; 7];
        // A nested chain defeats the single-node SIMD probe.
        let e = (&a + &b) + &a;
        assign_vec(&mut dst, &e).unwrap();
        for (i, &v) in dst.iter().enumerate() {
            assert_eq!(v, 12.0 * i as f64);
        }
    }

    #[test]
    fn compound_assign_merges_in_place() {
        let a = DynamicVector::from_fn(5, |i| i as f64);
        let mut dst = [1.0_f64; 5];
        add_assign_vec(&mut dst, &&a).unwrap();
        assert_eq!(dst, [1.0, 2.0, 3.0, 4.0, 5.0]);
        sub_assign_vec(&mut dst, &&a).unwrap();
        assert_eq!(dst, [1.0; 5]);
    }
}
