//! Dense and sparse linear algebra with a fused, aliasing-aware assignment
//! engine.
//!
//! # Core Types
//!
//! - [`DynamicVector`] / [`DynamicMatrix`]: Owned dense containers over
//!   64-byte-aligned storage, padded to a SIMD granule so vectorized loops
//!   never touch uninitialized memory
//! - [`CompressedVector`] / [`CompressedMatrix`]: Sparse containers storing
//!   explicit `(index, value)` pairs (sorted pairs / compressed sparse row)
//! - Views ([`Subvector`], [`Submatrix`], [`Row`], [`Column`] and their
//!   `Mut` variants): Non-owning windows, bounds-checked at construction
//! - Adaptors ([`SymmetricMatrix`], [`HermitianMatrix`], [`DiagonalMatrix`]):
//!   Wrappers that enforce structural invariants on every write
//!
//! # Expressions
//!
//! Arithmetic on references builds lazy expression nodes; nothing is computed
//! until the expression is assigned or evaluated. Assignment fuses the whole
//! chain into a single pass over the destination:
//!
//! ```rust
//! use linfuse::{DynamicVector, VecExpr};
//!
//! let a = DynamicVector::from_slice(&[1.0_f64, 2.0, 3.0]);
//! let b = DynamicVector::from_slice(&[4.0, 5.0, 6.0]);
//! let mut c = DynamicVector::new();
//!
//! c.assign(&(&a + &b)).unwrap();
//! assert_eq!(c.as_slice(), &[5.0, 7.0, 9.0]);
//!
//! // Chains fuse into one loop; scaling is `expr * scalar`.
//! let d = ((&a - &b) * 2.0).eval().unwrap();
//! assert_eq!(d.as_slice(), &[-6.0, -6.0, -6.0]);
//! ```
//!
//! # Assignment engine
//!
//! Evaluating `lhs = expr` follows a fixed protocol: validate sizes, test
//! whether the expression may read the destination's storage (raw address
//! ranges, no deep analysis), detour through a temporary if it may, then
//! dispatch the write loop. Contiguous copies larger than the cache
//! threshold use non-temporal streaming stores; binary operations over
//! SIMD-capable contiguous operands use runtime-dispatched vector kernels;
//! everything else runs a fused scalar loop unrolled by four (two for
//! compound assignment). Sparse right-hand sides never walk the dense
//! shape — only their stored pairs are visited.
//!
//! Set `LINFUSE_TRACE=1` to log which path the engine picks.
//!
//! # Cargo features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `simd`  | yes     | Runtime-dispatched vector kernels via `pulp` |

mod adaptor;
mod assign;
mod dense_matrix;
mod dense_vector;
mod expr;
mod memory;
mod ops;
mod scalar;
mod simd;
mod sparse_matrix;
mod sparse_vector;
mod view;

pub use adaptor::{DiagonalMatrix, HermitianMatrix, SymmetricMatrix};
pub use dense_matrix::DynamicMatrix;
pub use dense_vector::DynamicVector;
pub use expr::{
    hadamard, schur, MatAdd, MatExpr, MatNeg, MatScale, MatSchur, MatSub, MatTrans, Span, VecAdd,
    VecExpr, VecNeg, VecScale, VecSchur, VecSub,
};
pub use ops::{axpy, dot, matmul, matvec, norm, norm_sqr, sparse_dot, sparse_matvec, sum};
pub use scalar::{Conjugate, Scalar};
pub use sparse_matrix::CompressedMatrix;
pub use sparse_vector::CompressedVector;
pub use view::{
    Column, ColumnMut, Row, RowMut, Submatrix, SubmatrixMut, Subvector, SubvectorMut,
};

// ============================================================================
// Constants
// ============================================================================

/// Cache size assumed by the streaming-store heuristic.
///
/// A contiguous destination whose working set would occupy more than a third
/// of this many bytes is written with non-temporal stores (when the
/// destination is provably not aliased by the right-hand side).
pub const CACHE_SIZE: usize = 3 * 1024 * 1024;

/// Cache line size in bytes.
///
/// Dense buffers are aligned to this boundary and padded to a multiple of it,
/// so any SIMD register width up to 512 bits stays in bounds and aligned.
pub const CACHE_LINE_SIZE: usize = 64;

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by container, view and expression operations.
///
/// Every variant is an invalid-argument condition; there are no retryable or
/// partial-failure states anywhere in the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vector lengths do not match.
    #[error("size mismatch: {0} vs {1}")]
    SizeMismatch(usize, usize),

    /// Matrix shapes do not match.
    #[error("shape mismatch: {lhs_rows}x{lhs_cols} vs {rhs_rows}x{rhs_cols}")]
    ShapeMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    /// Subvector window exceeds the owner.
    #[error("invalid subvector specification: offset {offset} + len {len} > size {size}")]
    InvalidSubvector {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Submatrix window exceeds the owner.
    #[error(
        "invalid submatrix specification: origin ({row},{column}) extent {rows}x{columns} \
         exceeds {owner_rows}x{owner_columns}"
    )]
    InvalidSubmatrix {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
        owner_rows: usize,
        owner_columns: usize,
    },

    /// Row/column/element index out of range.
    #[error("invalid index {index} for extent {extent}")]
    InvalidIndex { index: usize, extent: usize },

    /// A square matrix was required.
    #[error("non-square matrix: rows={rows}, cols={cols}")]
    NonSquare { rows: usize, cols: usize },

    /// Matrix is not symmetric at the given position.
    #[error("matrix is not symmetric at ({row}, {column})")]
    NotSymmetric { row: usize, column: usize },

    /// Matrix is not Hermitian at the given position.
    #[error("matrix is not Hermitian at ({row}, {column})")]
    NotHermitian { row: usize, column: usize },

    /// Matrix has a non-zero off-diagonal element.
    #[error("matrix is not diagonal at ({row}, {column})")]
    NotDiagonal { row: usize, column: usize },

    /// Hermitian diagonal element must equal its own conjugate.
    #[error("invalid diagonal element at index {index}: must be self-conjugate")]
    InvalidDiagonal { index: usize },

    /// Write to an element that the adaptor keeps structurally fixed.
    #[error("invalid assignment to restricted element ({row}, {column})")]
    RestrictedElement { row: usize, column: usize },

    /// Requested more non-zero elements than the container can hold.
    #[error("invalid number of non-zero elements: {requested} > {limit}")]
    InvalidNonzeros { requested: usize, limit: usize },

    /// Sparse vector already stores an element at this index.
    #[error("duplicate sparse element at index {0}")]
    DuplicateIndex(usize),

    /// Sparse matrix already stores an element at this position.
    #[error("duplicate sparse element at ({row}, {column})")]
    DuplicateEntry { row: usize, column: usize },

    /// Sparse append/finalize called out of row-major order.
    #[error("sparse append out of order")]
    UnorderedAppend,
}

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
