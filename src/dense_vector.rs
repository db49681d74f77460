//! Owned dense vector with padded, aligned storage.

use crate::expr::{Span, VecExpr};
use crate::memory::AlignedVec;
use crate::scalar::Scalar;
use crate::sparse_vector::CompressedVector;
use crate::view::{Subvector, SubvectorMut};
use crate::{assign, simd, Error, Result};
use rand::distributions::{Distribution, Standard};
use rand::Rng;
use rand_distr::StandardNormal;

/// A heap-allocated vector of `T` with `size <= capacity`.
///
/// The backing buffer is cache-line aligned and padded to a SIMD granule;
/// all padding is zero-filled. Arithmetic on `&DynamicVector` builds lazy
/// expressions (see [`VecExpr`]); [`assign`](Self::assign) evaluates them.
#[derive(Clone)]
pub struct DynamicVector<T: Scalar> {
    size: usize,
    data: AlignedVec<T>,
}

impl<T: Scalar> DynamicVector<T> {
    /// An empty vector; no allocation.
    pub fn new() -> Self {
        Self {
            size: 0,
            data: AlignedVec::new(),
        }
    }

    /// A vector of `n` zeros.
    pub fn zeros(n: usize) -> Self {
        Self {
            size: n,
            data: AlignedVec::zeroed(n),
        }
    }

    /// A vector of `n` copies of `value`.
    pub fn from_elem(n: usize, value: T) -> Self {
        let mut v = Self::zeros(n);
        v.as_mut_slice().fill(value);
        v
    }

    /// Copy construction from a slice.
    pub fn from_slice(values: &[T]) -> Self {
        let mut v = Self::zeros(values.len());
        v.as_mut_slice().copy_from_slice(values);
        v
    }

    /// Element `i` is `f(i)`.
    pub fn from_fn(n: usize, mut f: impl FnMut(usize) -> T) -> Self {
        let mut v = Self::zeros(n);
        for (i, x) in v.as_mut_slice().iter_mut().enumerate() {
            *x = f(i);
        }
        v
    }

    /// Uniformly random elements.
    pub fn random<R: Rng>(n: usize, rng: &mut R) -> Self
    where
        Standard: Distribution<T>,
    {
        Self::from_fn(n, |_| rng.gen())
    }

    /// Standard-normal random elements.
    pub fn random_normal<R: Rng>(n: usize, rng: &mut R) -> Self
    where
        StandardNormal: Distribution<T>,
    {
        Self::from_fn(n, |_| StandardNormal.sample(rng))
    }

    /// Number of logical elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Capacity in elements, always a granule multiple.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// The logical elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data.as_slice()[..self.size]
    }

    /// The logical elements, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data.as_mut_slice()[..self.size]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Grow the capacity to hold at least `n` elements.
    pub fn reserve(&mut self, n: usize) {
        self.data.grow_zeroed(n, self.size);
    }

    /// Change the size to `n`.
    ///
    /// With `preserve` the old prefix survives; without it all elements are
    /// zero afterwards. New elements are always zero. Shrinking re-zeros the
    /// abandoned suffix so the padding invariant holds.
    pub fn resize(&mut self, n: usize, preserve: bool) {
        if n == self.size {
            return;
        }
        if n > self.data.capacity() {
            if preserve {
                self.data.grow_zeroed(n, self.size);
            } else {
                self.data = AlignedVec::zeroed(n);
            }
        } else if !preserve {
            let live = self.size.min(self.data.capacity());
            assign::fill_zero(&mut self.data.as_mut_slice()[..live]);
        } else if n < self.size {
            assign::fill_zero(&mut self.data.as_mut_slice()[n..self.size]);
        }
        self.size = n;
    }

    /// Append `n` elements (zero unless `preserve` is false, in which case
    /// the whole vector is zeroed).
    pub fn extend_by(&mut self, n: usize, preserve: bool) {
        self.resize(self.size + n, preserve);
    }

    /// Size zero; keeps the allocation.
    pub fn clear(&mut self) {
        self.resize(0, false);
    }

    /// Zero every element, keeping the size.
    pub fn reset(&mut self) {
        let s = &mut self.data.as_mut_slice()[..self.size];
        assign::fill_zero(s);
    }

    /// Number of non-zero logical elements.
    pub fn nonzeros(&self) -> usize {
        self.as_slice().iter().filter(|v| !v.is_zero()).count()
    }

    /// Multiply every element by `factor` in place.
    pub fn scale(&mut self, factor: T) {
        let s = &mut self.data.as_mut_slice()[..self.size];
        if !simd::try_scale_assign(s, factor) {
            for x in s {
                *x = factor * *x;
            }
        }
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// A contiguous window of `len` elements starting at `offset`.
    pub fn subvector(&self, offset: usize, len: usize) -> Result<Subvector<'_, T>> {
        check_window(offset, len, self.size)?;
        Ok(Subvector::new(&self.as_slice()[offset..offset + len]))
    }

    /// A mutable contiguous window of `len` elements starting at `offset`.
    pub fn subvector_mut(&mut self, offset: usize, len: usize) -> Result<SubvectorMut<'_, T>> {
        check_window(offset, len, self.size)?;
        Ok(SubvectorMut::new(
            &mut self.as_mut_slice()[offset..offset + len],
        ))
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    /// `self = expr`, resizing to the expression's length.
    pub fn assign<E: VecExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        expr.validate()?;
        if self.size != expr.len() {
            self.resize(expr.len(), false);
        }
        assign::assign_vec(self.as_mut_slice(), expr)
    }

    /// `self += expr`; lengths must match.
    pub fn add_assign_expr<E: VecExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        assign::add_assign_vec(self.as_mut_slice(), expr)
    }

    /// `self -= expr`; lengths must match.
    pub fn sub_assign_expr<E: VecExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        assign::sub_assign_vec(self.as_mut_slice(), expr)
    }

    /// Elementwise `self *= expr`; lengths must match.
    pub fn mul_assign_expr<E: VecExpr<Elem = T>>(&mut self, expr: &E) -> Result<()> {
        assign::mul_assign_vec(self.as_mut_slice(), expr)
    }

    /// `self = sparse`, resizing to the sparse vector's length. Only the
    /// stored pairs are visited after the zero-fill.
    pub fn assign_sparse(&mut self, rhs: &CompressedVector<T>) {
        if self.size != rhs.len() {
            self.resize(rhs.len(), false);
        }
        assign::assign_sparse_vec(self.as_mut_slice(), rhs);
    }

    /// `self += sparse`; lengths must match.
    pub fn add_assign_sparse(&mut self, rhs: &CompressedVector<T>) -> Result<()> {
        if self.size != rhs.len() {
            return Err(Error::SizeMismatch(self.size, rhs.len()));
        }
        assign::add_assign_sparse_vec(self.as_mut_slice(), rhs);
        Ok(())
    }

    /// `self -= sparse`; lengths must match.
    pub fn sub_assign_sparse(&mut self, rhs: &CompressedVector<T>) -> Result<()> {
        if self.size != rhs.len() {
            return Err(Error::SizeMismatch(self.size, rhs.len()));
        }
        assign::sub_assign_sparse_vec(self.as_mut_slice(), rhs);
        Ok(())
    }

    /// Copy `len` elements from `src_offset` to `dst_offset` inside this
    /// vector.
    ///
    /// The two windows may overlap; overlapping copies detour through a
    /// temporary, exactly like an aliased expression assignment.
    pub fn copy_within(&mut self, src_offset: usize, dst_offset: usize, len: usize) -> Result<()> {
        check_window(src_offset, len, self.size)?;
        check_window(dst_offset, len, self.size)?;
        if len == 0 || src_offset == dst_offset {
            return Ok(());
        }
        let overlap = src_offset < dst_offset + len && dst_offset < src_offset + len;
        if overlap {
            let tmp = self.as_slice()[src_offset..src_offset + len].to_vec();
            assign::copy_dense(
                &mut self.as_mut_slice()[dst_offset..dst_offset + len],
                &tmp,
            );
            return Ok(());
        }
        // Disjoint windows inside one buffer; borrow both through raw parts.
        let base = self.data.as_mut_slice().as_mut_ptr();
        unsafe {
            let src = std::slice::from_raw_parts(base.add(src_offset), len);
            let dst = std::slice::from_raw_parts_mut(base.add(dst_offset), len);
            assign::copy_dense(dst, src);
        }
        Ok(())
    }
}

fn check_window(offset: usize, len: usize, size: usize) -> Result<()> {
    let end = offset.checked_add(len);
    match end {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::InvalidSubvector { offset, len, size }),
    }
}

impl<T: Scalar> Default for DynamicVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> PartialEq for DynamicVector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Scalar> std::fmt::Debug for DynamicVector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Scalar> std::ops::Index<usize> for DynamicVector<T> {
    type Output = T;

    #[inline]
    fn index(&self, i: usize) -> &T {
        &self.as_slice()[i]
    }
}

impl<T: Scalar> std::ops::IndexMut<usize> for DynamicVector<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.as_mut_slice()[i]
    }
}

impl<'a, T: Scalar> VecExpr for &'a DynamicVector<T> {
    type Elem = T;

    #[inline]
    fn len(&self) -> usize {
        self.size
    }

    #[inline]
    fn at(&self, i: usize) -> T {
        DynamicVector::as_slice(self)[i]
    }

    fn aliases(&self, span: Span) -> bool {
        span.overlaps(Span::of(DynamicVector::as_slice(self)))
    }

    fn as_slice(&self) -> Option<&[T]> {
        Some(DynamicVector::as_slice(self))
    }
}
