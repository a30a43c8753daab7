//! Matrices distributed over a two-dimensional grid of processes.
//!
//! The processes of a [`Transport`] are arranged by a [`Grid`] into `height` rows and `width`
//! columns, in column-major order. A [`DistMat`] holds, on every rank, the entries of a global
//! matrix that the rank owns under its pair of [`Dist`] tags: the first tag distributes the rows
//! (the column index of the matrix is fixed), the second one distributes the columns.
//!
//! | tag      | owner of index `i`                                           |
//! |----------|--------------------------------------------------------------|
//! | `Mc`     | grid row `(align + i) % height`                              |
//! | `Mr`     | grid column `(align + i) % width`                            |
//! | `Vc`     | rank `(align + i) % size`, ranks ordered column-major        |
//! | `Vr`     | rank `(align + i) % size`, ranks ordered row-major           |
//! | `Md`     | process `((r0 + i) % height, (c0 + i) % width)`              |
//! | `Star`   | every rank                                                   |
//!
//! Every routine of this module is collective: each rank of the grid must call it, in the same
//! order, with arguments describing the same global operands.
//!
//! ```
//! use gridla::dist::{lu, spawn_world, Dist, DistMat, Grid};
//! use gridla::mat;
//! use std::sync::Arc;
//!
//! let a = mat![[2.0, 1.0], [4.0, 3.0f64]];
//! let results = spawn_world(4, |transport| {
//!     let grid = Grid::new(Arc::new(transport), 2).unwrap();
//!     let mut da = DistMat::from_mat(&grid, a.as_ref(), Dist::Mc, Dist::Mr).unwrap();
//!     let mut p = DistMat::<usize>::new(&grid, 2, 1, Dist::Vc, Dist::Star).unwrap();
//!     lu::lu_in_place(da.as_mut(), p.as_mut(), Default::default()).unwrap();
//!     (da.to_mat().unwrap(), p.to_mat().unwrap())
//! });
//! for (lu, p) in results {
//!     assert_eq!((p.read(0, 0), p.read(1, 0)), (1, 0));
//!     assert_eq!(lu.read(1, 1), -0.5);
//! }
//! ```

mod comm;
mod grid;
mod matrix;
mod perm;
mod redist;

pub mod diagonal;
pub mod householder;
pub mod lu;
pub mod multishift;
pub mod reductions;
pub mod sign;
pub mod triangular_solve;

pub use comm::{spawn_world, Comm, Payload, SelfTransport, ThreadTransport, Transport};
pub use grid::Grid;
pub use matrix::{Dist, DistMat, DistMatMut, DistMatRef, Element};
pub use perm::{permute_cols, permute_rows};
pub use redist::redistribute;
