//! Norms of distributed matrices.
//!
//! Entries replicated over several ranks are only counted by the rank of smallest coordinate
//! along each replicated grid dimension. The partial results are then combined over the world,
//! so every rank returns the same value.

use super::matrix::{DistMatRef, Element};
use crate::{
    linalg::reductions::{norm_frobenius as local_frobenius, norm_max as local_max},
    ComplexField, RealField, Result,
};

// whether the calling rank counts the entries it holds
fn is_canonical<E: Element>(a: &DistMatRef<'_, E>) -> bool {
    let grid = a.grid();
    let (col_dist, row_dist) = (a.col_dist(), a.row_dist());
    let rows_replicated = !(col_dist.uses_grid_rows() || row_dist.uses_grid_rows());
    let cols_replicated = !(col_dist.uses_grid_cols() || row_dist.uses_grid_cols());
    (!rows_replicated || grid.row() == 0) && (!cols_replicated || grid.col() == 0)
}

/// Returns the Frobenius norm of `a`. Collective over the grid.
///
/// # Errors
///
/// - [`crate::Error::Communication`] if a collective failed.
pub fn norm_frobenius<E: ComplexField>(a: DistMatRef<'_, E>) -> Result<E::Real> {
    let zero = E::Real::zero();
    let local = if is_canonical(&a) {
        local_frobenius(a.local())
    } else {
        zero
    };
    let parts = a.grid().world().all_gather(local)?;

    let scale = parts.iter().fold(zero, |acc, &x| acc.max(x));
    if scale == zero || !scale.is_finite() {
        return Ok(scale);
    }
    let mut ssq = zero;
    for x in parts {
        let r = x / scale;
        ssq += r * r;
    }
    Ok(scale * ssq.sqrt())
}

/// Returns the one-norm of `a`: the largest sum of moduli over the columns. Collective over the
/// grid.
///
/// # Errors
///
/// - [`crate::Error::Communication`] if a collective failed.
pub fn norm_one<E: ComplexField>(a: DistMatRef<'_, E>) -> Result<E::Real> {
    let mut sums = vec![E::Real::zero(); a.ncols()];
    if is_canonical(&a) {
        let local = a.local();
        for lj in 0..local.ncols() {
            let j = a.global_col(lj);
            for li in 0..local.nrows() {
                sums[j] += local.read(li, lj).abs();
            }
        }
    }
    a.grid().world().sum_in_place(&mut sums)?;
    Ok(sums
        .into_iter()
        .fold(E::Real::zero(), |acc, x| acc.max(x)))
}

/// Returns the largest modulus of the entries of `a`. Collective over the grid.
///
/// # Errors
///
/// - [`crate::Error::Communication`] if a collective failed.
pub fn norm_max<E: ComplexField>(a: DistMatRef<'_, E>) -> Result<E::Real> {
    let parts = a.grid().world().all_gather(local_max(a.local()))?;
    Ok(parts
        .into_iter()
        .fold(E::Real::zero(), |acc, x| acc.max(x)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assert, c64,
        dist::{spawn_world, Dist, DistMat, Grid},
        linalg::reductions,
        Mat,
    };
    use assert_approx_eq::assert_approx_eq;
    use std::sync::Arc;

    #[test]
    fn matches_local_norms() {
        let a = Mat::from_fn(7, 5, |i, j| c64::new(i as f64 - 3.0, (j * i) as f64 * 0.5 - 1.0));
        let expected = (
            reductions::norm_frobenius(a.as_ref()),
            reductions::norm_one(a.as_ref()),
            reductions::norm_max(a.as_ref()),
        );
        for (size, height) in [(4, 2), (3, 1), (1, 1)] {
            let results = spawn_world(size, |transport| {
                let grid = Grid::new(Arc::new(transport), height).unwrap();
                let mut norms = Vec::new();
                for (col_dist, row_dist) in [
                    (Dist::Mc, Dist::Mr),
                    (Dist::Star, Dist::Star),
                    (Dist::Vc, Dist::Star),
                    (Dist::Star, Dist::Mr),
                    (Dist::Md, Dist::Star),
                ] {
                    let da = DistMat::from_mat(&grid, a.as_ref(), col_dist, row_dist).unwrap();
                    norms.push((
                        norm_frobenius(da.as_ref()).unwrap(),
                        norm_one(da.as_ref()).unwrap(),
                        norm_max(da.as_ref()).unwrap(),
                    ));
                }
                norms
            });
            for norms in results {
                for (frobenius, one, max) in norms {
                    assert_approx_eq!(frobenius, expected.0, 1e-12);
                    assert_approx_eq!(one, expected.1, 1e-12);
                    assert!(max == expected.2);
                }
            }
        }
    }

    #[test]
    fn empty_matrix() {
        let grid = Grid::single();
        let a = DistMat::<f64>::new(&grid, 0, 3, Dist::Mc, Dist::Mr).unwrap();
        assert!(norm_frobenius(a.as_ref()).unwrap() == 0.0);
        assert!(norm_one(a.as_ref()).unwrap() == 0.0);
        assert!(norm_max(a.as_ref()).unwrap() == 0.0);
    }
}
