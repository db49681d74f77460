//! Aligned, padded, zero-filled buffers backing the dense containers.
//!
//! Two invariants hold for every buffer at all times:
//!
//! 1. The capacity is a multiple of the padding granule (one cache line worth
//!    of elements) and every element past the logical length is zero, so a
//!    vectorized loop over the padded region never reads uninitialized memory
//!    and elementwise kernels compute `0 op 0 = 0` in the padding.
//! 2. The base pointer is cache-line aligned, so any index that is a multiple
//!    of the granule is aligned for any SIMD register width up to 512 bits.
//!    Non-temporal stores rely on this.

use crate::scalar::Scalar;
use crate::CACHE_LINE_SIZE;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

/// Number of elements in one padding granule.
#[inline]
pub(crate) fn granule<T>() -> usize {
    let size = std::mem::size_of::<T>();
    if size == 0 {
        1
    } else {
        (CACHE_LINE_SIZE / size).max(1)
    }
}

/// Round `n` up to the next multiple of the padding granule.
#[inline]
pub(crate) fn padded_len<T>(n: usize) -> usize {
    let g = granule::<T>();
    n.div_ceil(g) * g
}

/// An owned, cache-line-aligned buffer of `T` with granule-padded capacity.
///
/// All elements, padding included, are initialized; allocation writes
/// `T::zero()` everywhere. Elements are `Copy`, so no drop glue runs.
pub(crate) struct AlignedVec<T: Scalar> {
    ptr: NonNull<T>,
    cap: usize,
}

unsafe impl<T: Scalar + Send> Send for AlignedVec<T> {}
unsafe impl<T: Scalar + Sync> Sync for AlignedVec<T> {}

impl<T: Scalar> AlignedVec<T> {
    /// An empty buffer; no allocation.
    pub(crate) fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
        }
    }

    /// Allocate a zero-filled buffer holding at least `n` elements, padded to
    /// the granule.
    pub(crate) fn zeroed(n: usize) -> Self {
        let cap = padded_len::<T>(n);
        if cap == 0 || std::mem::size_of::<T>() == 0 {
            return Self::new();
        }
        let ptr = Self::alloc_zeroed(cap);
        Self { ptr, cap }
    }

    /// Capacity in elements (a multiple of the granule).
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    /// The full buffer, padding included.
    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.cap) }
    }

    /// The full buffer, padding included.
    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.cap) }
    }

    /// Grow to hold at least `min` elements, keeping the first `live`
    /// elements and zeroing everything behind them. Shrinking never
    /// reallocates.
    pub(crate) fn grow_zeroed(&mut self, min: usize, live: usize) {
        let new_cap = padded_len::<T>(min);
        if new_cap <= self.cap {
            return;
        }
        debug_assert!(live <= self.cap);
        let new_ptr = Self::alloc_zeroed(new_cap);
        if live > 0 {
            unsafe {
                std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), live);
            }
        }
        self.release();
        self.ptr = new_ptr;
        self.cap = new_cap;
    }

    fn layout(cap: usize) -> Layout {
        let bytes = cap
            .checked_mul(std::mem::size_of::<T>())
            .expect("capacity overflow");
        let align = CACHE_LINE_SIZE.max(std::mem::align_of::<T>());
        Layout::from_size_align(bytes, align).expect("capacity overflow")
    }

    fn alloc_zeroed(cap: usize) -> NonNull<T> {
        let layout = Self::layout(cap);
        let raw = unsafe { alloc(layout) } as *mut T;
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };
        // T::zero() is not necessarily the all-zero bit pattern, so the
        // buffer is filled explicitly rather than with alloc_zeroed.
        for i in 0..cap {
            unsafe { ptr.as_ptr().add(i).write(T::zero()) };
        }
        ptr
    }

    fn release(&mut self) {
        if self.cap != 0 && std::mem::size_of::<T>() != 0 {
            unsafe { dealloc(self.ptr.as_ptr() as *mut u8, Self::layout(self.cap)) };
        }
    }
}

impl<T: Scalar> Drop for AlignedVec<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Scalar> Clone for AlignedVec<T> {
    fn clone(&self) -> Self {
        if self.cap == 0 {
            return Self::new();
        }
        let ptr = Self::alloc_zeroed(self.cap);
        unsafe {
            std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), self.cap);
        }
        Self { ptr, cap: self.cap }
    }
}
