//! Sparse matrix in compressed sparse row format.

use crate::scalar::Scalar;
use crate::{Error, Result};
use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// A sparse `rows x cols` matrix: `row_ptr` bounds each row's slice of
/// `col_idx`/`values`, both kept in row-major order with strictly increasing
/// columns inside a row.
///
/// Rows are built with the [`append`](Self::append)/[`finalize`](Self::finalize)
/// protocol: append the pairs of row `r` in column order, then seal the row.
/// Rows must be sealed in ascending order; unsealed rows read as empty.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedMatrix<T: Scalar> {
    rows: usize,
    cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
    cursor: usize,
}

impl<T: Scalar> CompressedMatrix<T> {
    /// An all-zero sparse matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row_ptr: vec![0; rows + 1],
            col_idx: Vec::new(),
            values: Vec::new(),
            cursor: 0,
        }
    }

    /// Build from coordinate triplets in any order.
    ///
    /// Duplicate coordinates are an error, out-of-range coordinates are an
    /// error.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, T)]) -> Result<Self> {
        let mut sorted: Vec<(usize, usize, T)> = triplets.to_vec();
        for &(r, c, _) in &sorted {
            if r >= rows {
                return Err(Error::InvalidIndex {
                    index: r,
                    extent: rows,
                });
            }
            if c >= cols {
                return Err(Error::InvalidIndex {
                    index: c,
                    extent: cols,
                });
            }
        }
        sorted.sort_by_key(|&(r, c, _)| (r, c));
        for w in sorted.windows(2) {
            if w[0].0 == w[1].0 && w[0].1 == w[1].1 {
                return Err(Error::DuplicateEntry {
                    row: w[0].0,
                    column: w[0].1,
                });
            }
        }
        let mut out = Self::new(rows, cols);
        out.col_idx.reserve(sorted.len());
        out.values.reserve(sorted.len());
        for &(r, c, v) in &sorted {
            out.col_idx.push(c);
            out.values.push(v);
            out.row_ptr[r + 1] += 1;
        }
        for r in 0..rows {
            out.row_ptr[r + 1] += out.row_ptr[r];
        }
        out.cursor = rows;
        Ok(out)
    }

    /// A sparse matrix with exactly `nnz` random values at distinct random
    /// positions.
    pub fn random<R: Rng>(rows: usize, cols: usize, nnz: usize, rng: &mut R) -> Result<Self>
    where
        Standard: Distribution<T>,
    {
        let limit = rows.checked_mul(cols).expect("capacity overflow");
        if nnz > limit {
            return Err(Error::InvalidNonzeros {
                requested: nnz,
                limit,
            });
        }
        let mut linear = rand::seq::index::sample(rng, limit, nnz).into_vec();
        linear.sort_unstable();
        let mut out = Self::new(rows, cols);
        out.col_idx.reserve(nnz);
        out.values.reserve(nnz);
        for pos in linear {
            let r = pos / cols;
            out.col_idx.push(pos % cols);
            out.values.push(rng.gen());
            out.row_ptr[r + 1] += 1;
        }
        for r in 0..rows {
            out.row_ptr[r + 1] += out.row_ptr[r];
        }
        out.cursor = rows;
        Ok(out)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.cols
    }

    /// Number of stored pairs.
    #[inline]
    pub fn nonzeros(&self) -> usize {
        self.values.len()
    }

    fn row_range(&self, r: usize) -> std::ops::Range<usize> {
        let lo = self.row_ptr[r];
        // Unsealed rows read as empty.
        let hi = self.row_ptr[r + 1].max(lo);
        lo..hi
    }

    /// Number of stored pairs in row `r`.
    pub fn nonzeros_in_row(&self, r: usize) -> usize {
        assert!(r < self.rows, "row index out of bounds");
        self.row_range(r).len()
    }

    /// Ensure room for at least `nnz` stored pairs.
    pub fn reserve(&mut self, nnz: usize) {
        if nnz > self.values.capacity() {
            let additional = nnz - self.values.len();
            self.values.reserve(additional);
            self.col_idx.reserve(additional);
        }
    }

    /// Push a pair into row `r`, which must be the row currently being
    /// built, with strictly increasing column indices.
    pub fn append(&mut self, r: usize, c: usize, value: T) -> Result<()> {
        if r >= self.rows {
            return Err(Error::InvalidIndex {
                index: r,
                extent: self.rows,
            });
        }
        if c >= self.cols {
            return Err(Error::InvalidIndex {
                index: c,
                extent: self.cols,
            });
        }
        if r != self.cursor {
            return Err(Error::UnorderedAppend);
        }
        // Pairs past row_ptr[r] belong to the row under construction.
        if self.values.len() > self.row_ptr[r] {
            let last = self.col_idx[self.col_idx.len() - 1];
            if c == last {
                return Err(Error::DuplicateEntry { row: r, column: c });
            }
            if c < last {
                return Err(Error::UnorderedAppend);
            }
        }
        self.col_idx.push(c);
        self.values.push(value);
        Ok(())
    }

    /// Seal row `r`; rows must be sealed in ascending order.
    pub fn finalize(&mut self, r: usize) -> Result<()> {
        if r >= self.rows {
            return Err(Error::InvalidIndex {
                index: r,
                extent: self.rows,
            });
        }
        if r != self.cursor {
            return Err(Error::UnorderedAppend);
        }
        self.row_ptr[r + 1] = self.values.len();
        self.cursor += 1;
        Ok(())
    }

    /// The value at `(r, c)`, zero if no pair is stored there.
    pub fn get(&self, r: usize, c: usize) -> T {
        assert!(r < self.rows && c < self.cols, "index out of bounds");
        let range = self.row_range(r);
        match self.col_idx[range.clone()].binary_search(&c) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => T::zero(),
        }
    }

    /// Iterate over row `r`'s stored pairs in column order.
    pub fn row_iter(&self, r: usize) -> impl Iterator<Item = (usize, &T)> + '_ {
        assert!(r < self.rows, "row index out of bounds");
        let range = self.row_range(r);
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter())
    }

    /// Remove all stored pairs, keeping the shape; the build protocol starts
    /// over at row 0.
    pub fn reset(&mut self) {
        self.col_idx.clear();
        self.values.clear();
        self.row_ptr.fill(0);
        self.cursor = 0;
    }

    /// Change the shape. With `preserve`, stored pairs that still fit
    /// survive; without it the matrix becomes all-zero.
    pub fn resize(&mut self, rows: usize, cols: usize, preserve: bool) {
        if !preserve {
            *self = Self::new(rows, cols);
            return;
        }
        let mut out = Self::new(rows, cols);
        for r in 0..self.rows.min(rows) {
            for (c, v) in self.row_iter(r) {
                if c < cols {
                    out.col_idx.push(c);
                    out.values.push(*v);
                }
            }
            out.row_ptr[r + 1] = out.values.len();
        }
        for r in self.rows.min(rows)..rows {
            out.row_ptr[r + 1] = out.values.len();
        }
        out.cursor = rows;
        *self = out;
    }

    /// Eager CSR transpose via a counting sort over columns.
    pub fn transpose(&self) -> CompressedMatrix<T> {
        let mut out = CompressedMatrix::new(self.cols, self.rows);
        out.col_idx = vec![0; self.nonzeros()];
        out.values = vec![T::zero(); self.nonzeros()];
        for r in 0..self.rows {
            for (c, _) in self.row_iter(r) {
                out.row_ptr[c + 1] += 1;
            }
        }
        for c in 0..self.cols {
            out.row_ptr[c + 1] += out.row_ptr[c];
        }
        let mut next = out.row_ptr.clone();
        for r in 0..self.rows {
            for (c, v) in self.row_iter(r) {
                let pos = next[c];
                out.col_idx[pos] = r;
                out.values[pos] = *v;
                next[c] += 1;
            }
        }
        out.cursor = out.rows;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn build_3x4() -> CompressedMatrix<f64> {
        // [ 1 0 2 0 ]
        // [ 0 0 0 0 ]
        // [ 0 3 0 4 ]
        let mut m = CompressedMatrix::new(3, 4);
        m.append(0, 0, 1.0).unwrap();
        m.append(0, 2, 2.0).unwrap();
        m.finalize(0).unwrap();
        m.finalize(1).unwrap();
        m.append(2, 1, 3.0).unwrap();
        m.append(2, 3, 4.0).unwrap();
        m.finalize(2).unwrap();
        m
    }

    #[test]
    fn append_finalize_protocol() {
        let m = build_3x4();
        assert_eq!(m.nonzeros(), 4);
        assert_eq!(m.nonzeros_in_row(0), 2);
        assert_eq!(m.nonzeros_in_row(1), 0);
        assert_eq!(m.get(0, 2), 2.0);
        assert_eq!(m.get(2, 3), 4.0);
        assert_eq!(m.get(1, 1), 0.0);
    }

    #[test]
    fn append_out_of_order_is_rejected() {
        let mut m = CompressedMatrix::<f64>::new(3, 3);
        m.append(0, 1, 1.0).unwrap();
        assert!(matches!(m.append(0, 1, 2.0), Err(Error::DuplicateEntry { .. })));
        assert!(matches!(m.append(0, 0, 2.0), Err(Error::UnorderedAppend)));
        assert!(matches!(m.append(2, 0, 2.0), Err(Error::UnorderedAppend)));
        m.finalize(0).unwrap();
        assert!(matches!(m.finalize(2), Err(Error::UnorderedAppend)));
    }

    #[test]
    fn from_triplets_sorts_and_rejects_duplicates() {
        let m =
            CompressedMatrix::from_triplets(2, 3, &[(1, 2, 6.0_f64), (0, 0, 1.0), (1, 0, 4.0)])
                .unwrap();
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.get(1, 2), 6.0);
        assert!(matches!(
            CompressedMatrix::from_triplets(2, 2, &[(0, 0, 1.0_f64), (0, 0, 2.0)]),
            Err(Error::DuplicateEntry { row: 0, column: 0 })
        ));
    }

    #[test]
    fn row_iter_yields_sorted_pairs() {
        let m = build_3x4();
        let row2: Vec<(usize, f64)> = m.row_iter(2).map(|(c, v)| (c, *v)).collect();
        assert_eq!(row2, vec![(1, 3.0), (3, 4.0)]);
    }

    #[test]
    fn transpose_round_trip() {
        let m = build_3x4();
        let t = m.transpose();
        assert_eq!(t.rows(), 4);
        assert_eq!(t.columns(), 3);
        assert_eq!(t.get(2, 0), 2.0);
        assert_eq!(t.get(1, 2), 3.0);
        assert_eq!(t.transpose(), m);
    }

    #[test]
    fn random_respects_target_nonzeros() {
        let mut rng = StdRng::seed_from_u64(99);
        let m = CompressedMatrix::<f64>::random(10, 8, 23, &mut rng).unwrap();
        assert_eq!(m.nonzeros(), 23);
        assert!(matches!(
            CompressedMatrix::<f64>::random(2, 2, 5, &mut rng),
            Err(Error::InvalidNonzeros {
                requested: 5,
                limit: 4
            })
        ));
    }

    #[test]
    fn resize_preserve_keeps_fitting_pairs() {
        let m = build_3x4();
        let mut m2 = m.clone();
        m2.resize(3, 2, true);
        assert_eq!(m2.nonzeros(), 2); // (0,0)=1 and (2,1)=3 survive
        assert_eq!(m2.get(0, 0), 1.0);
        assert_eq!(m2.get(2, 1), 3.0);
    }
}
