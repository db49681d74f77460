//! Sparse vector storing explicit `(index, value)` pairs.

use crate::scalar::Scalar;
use crate::{Error, Result};
use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// A sparse vector of logical length `size`.
///
/// Stored pairs are kept sorted by index and unique. A stored value may be
/// zero (after in-place arithmetic, say); [`retain_nonzero`](Self::retain_nonzero)
/// compacts those away.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedVector<T: Scalar> {
    size: usize,
    elems: Vec<(usize, T)>,
}

impl<T: Scalar> CompressedVector<T> {
    /// An all-zero sparse vector of logical length `size`.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            elems: Vec::new(),
        }
    }

    /// Like [`new`](Self::new), with room for `nnz` stored pairs.
    pub fn with_capacity(size: usize, nnz: usize) -> Self {
        Self {
            size,
            elems: Vec::with_capacity(nnz),
        }
    }

    /// A sparse vector with exactly `nnz` random values at distinct random
    /// indices.
    ///
    /// Requesting more non-zeros than the vector can hold is an error.
    pub fn random<R: Rng>(size: usize, nnz: usize, rng: &mut R) -> Result<Self>
    where
        Standard: Distribution<T>,
    {
        if nnz > size {
            return Err(Error::InvalidNonzeros {
                requested: nnz,
                limit: size,
            });
        }
        let mut indices = rand::seq::index::sample(rng, size, nnz).into_vec();
        indices.sort_unstable();
        let elems = indices.into_iter().map(|i| (i, rng.gen())).collect();
        Ok(Self { size, elems })
    }

    /// Logical length.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of stored pairs.
    #[inline]
    pub fn nonzeros(&self) -> usize {
        self.elems.len()
    }

    /// Storage capacity in pairs.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.elems.capacity()
    }

    /// Ensure room for at least `nnz` stored pairs.
    pub fn reserve(&mut self, nnz: usize) {
        if nnz > self.elems.capacity() {
            self.elems.reserve(nnz - self.elems.len());
        }
    }

    fn position(&self, index: usize) -> std::result::Result<usize, usize> {
        self.elems.binary_search_by_key(&index, |&(i, _)| i)
    }

    /// The value at `index`, zero if no pair is stored there.
    pub fn get(&self, index: usize) -> T {
        assert!(index < self.size, "index out of bounds");
        match self.position(index) {
            Ok(pos) => self.elems[pos].1,
            Err(_) => T::zero(),
        }
    }

    /// Store `value` at `index`, replacing any existing pair.
    pub fn set(&mut self, index: usize, value: T) {
        assert!(index < self.size, "index out of bounds");
        match self.position(index) {
            Ok(pos) => self.elems[pos].1 = value,
            Err(pos) => self.elems.insert(pos, (index, value)),
        }
    }

    /// Store `value` at `index`; storing over an existing pair is an error.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        assert!(index < self.size, "index out of bounds");
        match self.position(index) {
            Ok(_) => Err(Error::DuplicateIndex(index)),
            Err(pos) => {
                self.elems.insert(pos, (index, value));
                Ok(())
            }
        }
    }

    /// Amortized O(1) push; `index` must be strictly greater than the last
    /// stored index.
    pub fn append(&mut self, index: usize, value: T) -> Result<()> {
        assert!(index < self.size, "index out of bounds");
        if let Some(&(last, _)) = self.elems.last() {
            if index <= last {
                return Err(Error::UnorderedAppend);
            }
        }
        self.elems.push((index, value));
        Ok(())
    }

    /// Remove the pair at `index`, if any.
    pub fn erase(&mut self, index: usize) {
        if let Ok(pos) = self.position(index) {
            self.elems.remove(pos);
        }
    }

    /// Drop stored pairs whose value is zero.
    pub fn retain_nonzero(&mut self) {
        self.elems.retain(|(_, v)| !v.is_zero());
    }

    /// Multiply every stored value by `factor`.
    pub fn scale(&mut self, factor: T) {
        for (_, v) in &mut self.elems {
            *v = factor * *v;
        }
    }

    /// Remove all stored pairs, keeping the logical length.
    pub fn reset(&mut self) {
        self.elems.clear();
    }

    /// Change the logical length. With `preserve`, pairs whose index still
    /// fits survive; without it the vector becomes all-zero.
    pub fn resize(&mut self, n: usize, preserve: bool) {
        if preserve {
            self.elems.retain(|&(i, _)| i < n);
        } else {
            self.elems.clear();
        }
        self.size = n;
    }

    /// Iterate over the stored pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.elems.iter().map(|(i, v)| (*i, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn set_get_and_ordering() {
        let mut s = CompressedVector::new(10);
        s.set(7, 7.0_f64);
        s.set(2, 2.0);
        s.set(5, 5.0);
        assert_eq!(s.nonzeros(), 3);
        assert_eq!(s.get(2), 2.0);
        assert_eq!(s.get(5), 5.0);
        assert_eq!(s.get(3), 0.0);
        let indices: Vec<usize> = s.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![2, 5, 7]);
    }

    #[test]
    fn set_overwrites_insert_errors() {
        let mut s = CompressedVector::new(4);
        s.set(1, 1.0_f64);
        s.set(1, 9.0);
        assert_eq!(s.get(1), 9.0);
        assert!(matches!(s.insert(1, 2.0), Err(Error::DuplicateIndex(1))));
        assert!(s.insert(2, 2.0).is_ok());
    }

    #[test]
    fn append_requires_increasing_index() {
        let mut s = CompressedVector::new(8);
        s.append(1, 1.0_f64).unwrap();
        s.append(4, 4.0).unwrap();
        assert!(matches!(s.append(4, 0.0), Err(Error::UnorderedAppend)));
        assert!(matches!(s.append(2, 0.0), Err(Error::UnorderedAppend)));
    }

    #[test]
    fn erase_and_retain() {
        let mut s = CompressedVector::new(6);
        s.set(0, 1.0_f64);
        s.set(3, 0.0);
        s.set(5, 5.0);
        s.erase(0);
        assert_eq!(s.nonzeros(), 2);
        s.retain_nonzero();
        assert_eq!(s.nonzeros(), 1);
        assert_eq!(s.get(5), 5.0);
    }

    #[test]
    fn resize_preserve_drops_out_of_range_pairs() {
        let mut s = CompressedVector::new(10);
        s.set(2, 2.0_f64);
        s.set(8, 8.0);
        s.resize(5, true);
        assert_eq!(s.len(), 5);
        assert_eq!(s.nonzeros(), 1);
        assert_eq!(s.get(2), 2.0);
    }

    #[test]
    fn random_respects_target_nonzeros() {
        let mut rng = StdRng::seed_from_u64(7);
        let s = CompressedVector::<f64>::random(100, 17, &mut rng).unwrap();
        assert_eq!(s.len(), 100);
        assert_eq!(s.nonzeros(), 17);
        // sorted and unique indices
        let idx: Vec<usize> = s.iter().map(|(i, _)| i).collect();
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn random_rejects_excessive_nonzeros() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            CompressedVector::<f64>::random(4, 5, &mut rng),
            Err(Error::InvalidNonzeros {
                requested: 5,
                limit: 4
            })
        ));
    }
}
