use approx::assert_relative_eq;
use linfuse::{
    dot, DynamicMatrix, DynamicVector, Error, MatExpr, VecExpr,
};

#[test]
fn subvector_bounds_are_checked_at_construction() {
    let v = DynamicVector::<f64>::zeros(10);
    assert!(v.subvector(0, 10).is_ok());
    assert!(v.subvector(10, 0).is_ok());
    assert!(matches!(
        v.subvector(5, 6),
        Err(Error::InvalidSubvector {
            offset: 5,
            len: 6,
            size: 10
        })
    ));
    // Offset arithmetic must not wrap.
    assert!(v.subvector(usize::MAX, 2).is_err());
}

#[test]
fn submatrix_bounds_are_checked_at_construction() {
    let m = DynamicMatrix::<f64>::zeros(4, 6);
    assert!(m.submatrix(0, 0, 4, 6).is_ok());
    assert!(m.submatrix(4, 6, 0, 0).is_ok());
    assert!(m.submatrix(2, 3, 2, 3).is_ok());
    assert!(matches!(
        m.submatrix(2, 3, 3, 3),
        Err(Error::InvalidSubmatrix { .. })
    ));
    assert!(matches!(
        m.row(4),
        Err(Error::InvalidIndex {
            index: 4,
            extent: 4
        })
    ));
    assert!(matches!(
        m.column(6),
        Err(Error::InvalidIndex {
            index: 6,
            extent: 6
        })
    ));
}

#[test]
fn expressions_over_subvectors_fuse() {
    let v = DynamicVector::from_fn(20, |i| i as f64);
    let head = v.subvector(0, 8).unwrap();
    let tail = v.subvector(12, 8).unwrap();
    let sum = (head + tail).eval().unwrap();
    for i in 0..8 {
        assert_eq!(sum[i], (i + i + 12) as f64);
    }
}

#[test]
fn assignment_through_subvector_mut() {
    let inc = DynamicVector::from_elem(4, 1.0_f64);
    let mut v = DynamicVector::zeros(10);
    {
        let mut w = v.subvector_mut(3, 4).unwrap();
        w.assign(&&inc).unwrap();
        w.add_assign_expr(&&inc).unwrap();
    }
    assert_eq!(v.as_slice(), &[0.0, 0.0, 0.0, 2.0, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0]);
    assert_eq!(v.nonzeros(), 4);
}

#[test]
fn row_and_column_views_read_the_same_matrix() {
    let m = DynamicMatrix::from_fn(5, 4, |i, j| (i * 4 + j) as f64);
    let r = m.row(2).unwrap();
    assert_eq!(r.as_slice(), &[8.0, 9.0, 10.0, 11.0]);

    let c = m.column(3).unwrap();
    let col: Vec<f64> = c.iter().copied().collect();
    assert_eq!(col, vec![3.0, 7.0, 11.0, 15.0, 19.0]);
}

#[test]
fn dot_of_row_and_column_requires_equal_length() {
    let m = DynamicMatrix::from_fn(5, 4, |i, j| (i + j) as f64);
    let r = m.row(0).unwrap();
    let c = m.column(0).unwrap();
    assert!(matches!(dot(&r, &c), Err(Error::SizeMismatch(4, 5))));
}

#[test]
fn column_mut_strided_writes() {
    let mut m = DynamicMatrix::from_fn(4, 4, |i, j| (i * 4 + j) as f64);
    let x = DynamicVector::from_slice(&[100.0_f64, 200.0, 300.0, 400.0]);
    {
        let mut c = m.column_mut(2).unwrap();
        c.assign(&&x).unwrap();
    }
    for i in 0..4 {
        assert_eq!(m[(i, 2)], 100.0 * (i + 1) as f64);
        // neighbors untouched
        assert_eq!(m[(i, 1)], (i * 4 + 1) as f64);
        assert_eq!(m[(i, 3)], (i * 4 + 3) as f64);
    }
    {
        let mut c = m.column_mut(2).unwrap();
        c.add_assign_expr(&&x).unwrap();
    }
    assert_eq!(m[(0, 2)], 200.0);
}

#[test]
fn submatrix_mut_expression_assignment() {
    let src = DynamicMatrix::from_fn(3, 3, |i, j| (i * 3 + j) as f64);
    let mut m = DynamicMatrix::<f64>::zeros(5, 5);
    {
        let mut w = m.submatrix_mut(1, 1, 3, 3).unwrap();
        w.assign(&((&src) * 2.0)).unwrap();
        w.sub_assign_expr(&&src).unwrap();
    }
    for i in 0..3 {
        for j in 0..3 {
            assert_relative_eq!(m[(i + 1, j + 1)], src[(i, j)]);
        }
    }
    // the frame stays zero
    for k in 0..5 {
        assert_eq!(m[(0, k)], 0.0);
        assert_eq!(m[(4, k)], 0.0);
        assert_eq!(m[(k, 0)], 0.0);
        assert_eq!(m[(k, 4)], 0.0);
    }
}

#[test]
fn submatrix_views_as_expression_leaves() {
    let m = DynamicMatrix::from_fn(6, 6, |i, j| (i * 6 + j) as f64);
    let top_left = m.submatrix(0, 0, 3, 3).unwrap();
    let bottom_right = m.submatrix(3, 3, 3, 3).unwrap();
    let s = (top_left + bottom_right).eval().unwrap();
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(s[(i, j)], m[(i, j)] + m[(i + 3, j + 3)]);
        }
    }
}

#[test]
fn overlapping_block_copy_through_views_matches_temporary_semantics() {
    // copy_submatrix is the aliasing-protocol entry point: the overlapping
    // source must be read as-if snapshotted before any write.
    let mut m = DynamicMatrix::from_fn(6, 6, |i, j| (i * 6 + j) as f64);
    let snapshot: Vec<f64> = (0..4)
        .flat_map(|i| (0..4).map(move |j| (i * 6 + j) as f64))
        .collect();
    m.copy_submatrix((0, 0), (2, 2), 4, 4).unwrap();
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(m[(i + 2, j + 2)], snapshot[i * 4 + j]);
        }
    }
}

#[test]
fn view_lifetimes_pin_the_owner() {
    // A view reads through the owner's buffer; mutating through a mutable
    // view is immediately visible to fresh immutable views.
    let mut v = DynamicVector::from_slice(&[1.0_f64, 2.0, 3.0, 4.0]);
    {
        let mut w = v.subvector_mut(1, 2).unwrap();
        w[0] = 20.0;
        w[1] = 30.0;
    }
    let r = v.subvector(0, 4).unwrap();
    assert_eq!(r.as_slice(), &[1.0, 20.0, 30.0, 4.0]);
}
