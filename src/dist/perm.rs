use super::{
    grid::Grid,
    matrix::{DistMatMut, Element, Layout},
    redist::{dimension_range, sender_of},
};
use crate::{perm::PermRef, Error, Result};
use reborrow::*;

/// Axis along which indices are moved.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Along {
    Rows,
    Cols,
}

// pushes `value`, the source entry `src` of the destination entry `dst`, to every process that
// holds `dst` and receives it from this rank
#[inline]
fn pack<E: Element>(
    grid: &Grid,
    layout: &Layout,
    dst: (usize, usize),
    src: (usize, usize),
    value: E,
    send: &mut [Vec<E>],
) {
    let me = grid.rank();
    let (r, c) = layout.owner(grid, dst.0, dst.1);
    for qc in dimension_range(c, grid.width()) {
        for qr in dimension_range(r, grid.height()) {
            if sender_of(grid, layout, src.0, src.1, qr, qc) == me {
                send[grid.rank_of(qr, qc)].push(value);
            }
        }
    }
}

/// Overwrites every index `d` of `moved` along `along` with the old content of index
/// `source(d)`. Collective over the grid.
///
/// `moved` is sorted and `source` maps it onto itself. Work and traffic are proportional to the
/// number of moved entries held or received by each rank.
pub(crate) fn permute_moved<E: Element>(
    matrix: DistMatMut<'_, E>,
    along: Along,
    moved: &[usize],
    source: impl Fn(usize) -> usize,
) -> Result<()> {
    let mut matrix = matrix;
    let grid = matrix.grid();
    let layout = matrix.layout();
    let (me_r, me_c) = (grid.row(), grid.col());

    let my_rows: Vec<usize> = layout.rows.indices(grid, me_r, me_c).collect();
    let my_cols: Vec<usize> = layout.cols.indices(grid, me_r, me_c).collect();

    let mut send: Vec<Vec<E>> = (0..grid.size()).map(|_| Vec::new()).collect();
    {
        let local = matrix.rb().local();
        match along {
            Along::Rows => {
                for (lj, &j) in my_cols.iter().enumerate() {
                    for &d in moved {
                        let s = source(d);
                        if let Ok(li) = my_rows.binary_search(&s) {
                            pack(grid, &layout, (d, j), (s, j), local.read(li, lj), &mut send);
                        }
                    }
                }
            }
            Along::Cols => {
                for &d in moved {
                    let s = source(d);
                    if let Ok(lj) = my_cols.binary_search(&s) {
                        for (li, &i) in my_rows.iter().enumerate() {
                            pack(grid, &layout, (i, d), (i, s), local.read(li, lj), &mut send);
                        }
                    }
                }
            }
        }
    }

    let recv = grid.world().all_to_all(send)?;
    let mut recv: Vec<_> = recv.into_iter().map(Vec::into_iter).collect();

    let mut local = matrix.local_mut();
    let mut take = |sender: usize| {
        recv[sender].next().ok_or(Error::Communication {
            reason: "permutation received too few values",
        })
    };
    match along {
        Along::Rows => {
            for (lj, &j) in my_cols.iter().enumerate() {
                for &d in moved {
                    if let Ok(li) = my_rows.binary_search(&d) {
                        let sender = sender_of(grid, &layout, source(d), j, me_r, me_c);
                        local.write(li, lj, take(sender)?);
                    }
                }
            }
        }
        Along::Cols => {
            for &d in moved {
                if let Ok(lj) = my_cols.binary_search(&d) {
                    for (li, &i) in my_rows.iter().enumerate() {
                        let sender = sender_of(grid, &layout, i, source(d), me_r, me_c);
                        local.write(li, lj, take(sender)?);
                    }
                }
            }
        }
    }

    if recv.iter_mut().any(|r| r.next().is_some()) {
        return Err(Error::Communication {
            reason: "permutation received too many values",
        });
    }
    Ok(())
}

/// Interchanges indices `a` and `b` of `matrix` along `along`. Collective over the grid.
pub(crate) fn swap<E: Element>(
    matrix: DistMatMut<'_, E>,
    along: Along,
    a: usize,
    b: usize,
) -> Result<()> {
    if a == b {
        return Ok(());
    }
    let moved = [Ord::min(a, b), Ord::max(a, b)];
    permute_moved(matrix, along, &moved, |d| if d == a { b } else { a })
}

fn permute<E: Element>(
    op: &'static str,
    matrix: DistMatMut<'_, E>,
    along: Along,
    perm: PermRef<'_>,
) -> Result<()> {
    let len = match along {
        Along::Rows => matrix.nrows(),
        Along::Cols => matrix.ncols(),
    };
    if perm.len() != len {
        return Err(Error::DimensionMismatch {
            op,
            expected: (len, 1),
            found: (perm.len(), 1),
        });
    }

    let (_, inverse) = perm.arrays();
    let moved: Vec<usize> = (0..len).filter(|&d| inverse[d] != d).collect();
    log::trace!(
        "permuting {} of {} {:?} of a [{:?}, {:?}] matrix",
        moved.len(),
        len,
        along,
        matrix.col_dist(),
        matrix.row_dist(),
    );
    permute_moved(matrix, along, &moved, |d| inverse[d])
}

/// Permutes the rows of `matrix` in place: row `i` of the result is row `perm.inverse()[i]` of
/// the input. Collective over the grid.
///
/// Only the rows that move are exchanged. Every value is packed before any row is overwritten,
/// so the permutation may contain cycles of any length.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `perm.len() != matrix.nrows()`.
/// - [`Error::Communication`] if the exchange delivered a wrong number of values.
pub fn permute_rows<E: Element>(matrix: DistMatMut<'_, E>, perm: PermRef<'_>) -> Result<()> {
    permute("dist::permute_rows", matrix, Along::Rows, perm)
}

/// Permutes the columns of `matrix` in place: column `j` of the result is column
/// `perm.inverse()[j]` of the input. Collective over the grid.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `perm.len() != matrix.ncols()`.
/// - [`Error::Communication`] if the exchange delivered a wrong number of values.
pub fn permute_cols<E: Element>(matrix: DistMatMut<'_, E>, perm: PermRef<'_>) -> Result<()> {
    permute("dist::permute_cols", matrix, Along::Cols, perm)
}
