use super::comm::{Comm, SelfTransport, Transport};
use crate::{Error, Result};
use std::sync::Arc;

/// Two-dimensional arrangement of the ranks of a world.
///
/// Ranks are placed in column-major order: rank `r` sits at grid row `r % height` and grid column
/// `r / height`.
///
/// Every distributed matrix borrows the grid it lives on, and operations on several distributed
/// operands require all of them to borrow the same `Grid` value.
pub struct Grid {
    height: usize,
    width: usize,
    row: usize,
    col: usize,
    world: Comm,
    col_comm: Comm,
    row_comm: Comm,
}

impl core::fmt::Debug for Grid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Grid")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("row", &self.row)
            .field("col", &self.col)
            .finish()
    }
}

impl Grid {
    /// Arranges the ranks of `transport` into a grid with `height` rows.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDistribution`] if `height` is zero or does not divide the number of
    /// ranks.
    pub fn new(transport: Arc<dyn Transport>, height: usize) -> Result<Self> {
        let size = transport.size();
        if height == 0 || size % height != 0 {
            return Err(Error::InvalidDistribution {
                op: "Grid::new",
                reason: "grid height must divide the number of ranks",
            });
        }
        let width = size / height;
        let rank = transport.rank();
        let row = rank % height;
        let col = rank / height;

        let col_members = (0..height).map(|r| r + col * height).collect();
        let row_members = (0..width).map(|c| row + c * height).collect();

        log::debug!("rank {rank} joins a {height}×{width} grid at ({row}, {col})");

        Ok(Self {
            height,
            width,
            row,
            col,
            col_comm: Comm::subgroup(transport.clone(), col_members),
            row_comm: Comm::subgroup(transport.clone(), row_members),
            world: Comm::world(transport),
        })
    }

    /// Returns the `1×1` grid of a single-process world.
    pub fn single() -> Self {
        let transport: Arc<dyn Transport> = Arc::new(SelfTransport);
        Self {
            height: 1,
            width: 1,
            row: 0,
            col: 0,
            world: Comm::world(transport.clone()),
            col_comm: Comm::subgroup(transport.clone(), vec![0]),
            row_comm: Comm::subgroup(transport, vec![0]),
        }
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of ranks in the grid.
    #[inline]
    pub fn size(&self) -> usize {
        self.height * self.width
    }

    /// Grid row of the calling rank.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Grid column of the calling rank.
    #[inline]
    pub fn col(&self) -> usize {
        self.col
    }

    /// World rank of the calling process.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank_of(self.row, self.col)
    }

    /// Rank in the column-major ordering of the grid, which is also the world rank.
    #[inline]
    pub fn vc_rank(&self) -> usize {
        self.rank()
    }

    /// Rank in the row-major ordering of the grid.
    #[inline]
    pub fn vr_rank(&self) -> usize {
        self.col + self.row * self.width
    }

    /// World rank of the process at `(row, col)`.
    #[inline]
    pub fn rank_of(&self, row: usize, col: usize) -> usize {
        row + col * self.height
    }

    /// Grid coordinates of the world rank `rank`.
    #[inline]
    pub fn coords_of(&self, rank: usize) -> (usize, usize) {
        (rank % self.height, rank / self.height)
    }

    /// Communicator over every rank, ordered by world rank.
    #[inline]
    pub fn world(&self) -> &Comm {
        &self.world
    }

    /// Communicator over the ranks of the calling rank's grid column, ordered by grid row.
    #[inline]
    pub fn col_comm(&self) -> &Comm {
        &self.col_comm
    }

    /// Communicator over the ranks of the calling rank's grid row, ordered by grid column.
    #[inline]
    pub fn row_comm(&self) -> &Comm {
        &self.row_comm
    }
}

pub(crate) fn check_same_grid(op: &'static str, a: &Grid, b: &Grid) -> Result<()> {
    if core::ptr::eq(a, b) {
        Ok(())
    } else {
        Err(Error::GridMismatch { op })
    }
}
