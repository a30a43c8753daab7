//! Householder reflectors stored row-wise in a packed matrix.
//!
//! A Householder reflector is a unitary transformation of the form
//! $$H = I - \tau u u^H,$$
//! that maps a vector onto a multiple of the first canonical basis vector.
//!
//! Factorizations that operate on rows (such as the LQ decomposition) leave a sequence of such
//! reflectors in the rows of a matrix `h`: reflector $j$ lives in row $i_\text{off} + j$ and has
//! its leading unit entry on the diagonal selected by `offset`, at column $j_\text{off} + j$. The
//! entries to the left of the diagonal are ignored, the diagonal entry is implicitly one, and the
//! coefficients $\tau_j$ are stored in a separate column vector `t`.
//!
//! [`apply_packed_reflectors`] applies the whole sequence to a matrix from the left. Blocks of
//! `blocksize` reflectors are aggregated into the compact form
//! $$H_{k+b-1} \cdots H_k = I - W S^{-1} W^H,$$
//! where $W$ holds the reflector vectors and $S$ is triangular, so that each block costs two
//! matrix products and one triangular solve.

use crate::{
    linalg::{
        matmul::{matmul, matmul_with_conj, triangular::rank_k_update},
        reductions::norm_frobenius,
        temp_mat_req, temp_mat_uninit,
        triangular_solve::{solve_lower_triangular_in_place, solve_upper_triangular_in_place},
    },
    ComplexField, Conj, Error, MatMut, MatRef, Parallelism, RealField, Result, Side,
};
use dyn_stack::{PodStack, SizeOverflow, StackReq};
use reborrow::*;

/// Order in which the reflectors of a packed sequence are applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Applies $H_0$ first, i.e. computes $H_{d-1} \cdots H_0 A$.
    Forward,
    /// Applies $H_{d-1}$ first, i.e. computes $H_0 \cdots H_{d-1} A$.
    Backward,
}

/// Packed reflector application tuning parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReflectorParams {
    /// Number of reflectors aggregated into one block. Must be positive.
    pub blocksize: usize,
}

impl Default for ReflectorParams {
    #[inline]
    fn default() -> Self {
        Self { blocksize: 128 }
    }
}

/// Returns the length of the diagonal of an `nrows × ncols` matrix that starts at `offset`.
///
/// A positive offset selects a superdiagonal, a negative offset a subdiagonal.
#[inline]
pub fn diagonal_length(nrows: usize, ncols: usize, offset: isize) -> usize {
    let shift = offset.unsigned_abs();
    if offset >= 0 {
        Ord::min(nrows, ncols.saturating_sub(shift))
    } else {
        Ord::min(nrows.saturating_sub(shift), ncols)
    }
}

fn safe_norm<R: RealField>(a: R, b: R, c: R) -> R {
    let a = a.abs();
    let b = b.abs();
    let c = c.abs();
    let max = a.max(b).max(c);
    if max == R::zero() {
        return R::zero();
    }
    let inv = max.inv();
    let (a, b, c) = (a * inv, b * inv, c * inv);
    max * (a * a + b * b + c * c).sqrt()
}

fn signed_beta<E: ComplexField>(alpha: E, norm: E::Real) -> E::Real {
    let beta = safe_norm(alpha.real(), alpha.imag(), norm);
    if alpha.real() <= E::Real::zero() {
        beta
    } else {
        -beta
    }
}

/// Computes a Householder reflector $H = I - \tau [1; v][1; v]^H$ such that
/// $$H^H \begin{bmatrix} \chi \\ x \end{bmatrix} = \begin{bmatrix} \beta \\ 0 \end{bmatrix},$$
/// with $\beta$ real. `chi` is overwritten with $\beta$, `x` with $v$, and $\tau$ is returned.
///
/// When $x = 0$ and $\chi$ is real, the reflector $H = I - 2 e_0 e_0^H$ is chosen: `chi` is
/// negated, `x` is left as is, and $\tau = 2$ is returned.
///
/// # Panics
///
/// Panics if `x` is not a column vector.
#[track_caller]
pub fn make_householder_in_place<E: ComplexField>(chi: &mut E, x: MatMut<'_, E>) -> E {
    crate::assert!(x.ncols() == 1);
    let mut x = x;

    let mut norm = norm_frobenius(x.rb());
    let mut alpha = *chi;

    if norm == E::Real::zero() && alpha.imag() == E::Real::zero() {
        *chi = -*chi;
        return E::from_f64(2.0);
    }

    let mut beta = signed_beta(alpha, norm);

    let safe_min = E::Real::min_positive();
    let safe_inv = safe_min / E::Real::epsilon();
    let mut count = 0usize;
    if beta.abs() < safe_inv {
        let inv_of_safe_inv = safe_inv.inv();
        loop {
            count += 1;
            crate::linalg::scale(E::from_real(inv_of_safe_inv), x.rb_mut());
            alpha = alpha.scale_real(inv_of_safe_inv);
            beta = beta * inv_of_safe_inv;
            if beta.abs() >= safe_inv {
                break;
            }
        }
        norm = norm_frobenius(x.rb());
        beta = signed_beta(alpha, norm);
    }

    let beta_e = E::from_real(beta);
    let tau = (beta_e - alpha) / beta_e;
    crate::linalg::scale((alpha - beta_e).inv(), x.rb_mut());

    for _ in 0..count {
        beta = beta * safe_inv;
    }
    *chi = E::from_real(beta);
    tau
}

/// Computes the size and alignment of required workspace for applying a packed sequence of
/// reflectors with [`apply_packed_reflectors`].
pub fn apply_packed_reflectors_req<E: ComplexField>(
    h_nrows: usize,
    h_ncols: usize,
    offset: isize,
    a_ncols: usize,
    params: ReflectorParams,
) -> Result<StackReq, SizeOverflow> {
    let diag_len = diagonal_length(h_nrows, h_ncols, offset);
    let bs = Ord::min(Ord::max(params.blocksize, 1), diag_len);
    StackReq::try_all_of([
        temp_mat_req::<E>(bs, h_ncols)?,
        temp_mat_req::<E>(bs, bs)?,
        temp_mat_req::<E>(bs, a_ncols)?,
    ])
}

pub(crate) fn check_reflector_args(
    op: &'static str,
    h_shape: (usize, usize),
    offset: isize,
    t_shape: (usize, usize),
    a_nrows: usize,
    params: ReflectorParams,
) -> Result<usize> {
    if h_shape.1 != a_nrows {
        return Err(Error::DimensionMismatch {
            op,
            expected: (h_shape.0, a_nrows),
            found: h_shape,
        });
    }
    let diag_len = diagonal_length(h_shape.0, h_shape.1, offset);
    if t_shape != (diag_len, 1) {
        return Err(Error::DimensionMismatch {
            op,
            expected: (diag_len, 1),
            found: t_shape,
        });
    }
    if params.blocksize == 0 {
        return Err(Error::InvalidParameter {
            op,
            reason: "block size must be positive",
        });
    }
    Ok(diag_len)
}

/// Returns the starting index of every block of `blocksize` reflectors, in application order.
pub(crate) fn block_starts(
    diag_len: usize,
    blocksize: usize,
    direction: Direction,
) -> impl Iterator<Item = usize> {
    let count = diag_len.div_ceil(blocksize);
    (0..count).map(move |b| match direction {
        Direction::Forward => b * blocksize,
        Direction::Backward => (count - 1 - b) * blocksize,
    })
}

/// Fills `v` with the conjugate of the panel `h`, made unit upper trapezoidal.
pub(crate) fn conj_unit_upper<E: ComplexField>(v: MatMut<'_, E>, h: MatRef<'_, E>) {
    let mut v = v;
    for j in 0..v.ncols() {
        for i in 0..v.nrows() {
            let value = if i == j {
                E::one()
            } else if i < j {
                h.read(i, j).conj()
            } else {
                E::zero()
            };
            v.write(i, j, value);
        }
    }
}

/// Overwrites the diagonal of `s` with the inverses of the (possibly conjugated) coefficients.
pub(crate) fn fix_diagonal<E: ComplexField>(conj: Conj, t: MatRef<'_, E>, s: MatMut<'_, E>) {
    let mut s = s;
    for i in 0..t.nrows() {
        s.write(i, i, conj.apply(t.read(i, 0)).inv());
    }
}

pub(crate) fn triangle_of(direction: Direction) -> Side {
    match direction {
        Direction::Forward => Side::Lower,
        Direction::Backward => Side::Upper,
    }
}

/// Applies the packed sequence of Householder reflectors stored in the rows of `h`, starting on
/// the diagonal `offset`, to `a` from the left.
///
/// Reflector $j$ is $H_j = I - \tau_j u_j u_j^H$, where $u_j$ is row $i_\text{off} + j$ of `h`
/// (read as a column) with an implicit one at column $j_\text{off} + j$ and zeros before it,
/// $i_\text{off} = \max(-\text{offset}, 0)$ and $j_\text{off} = \max(\text{offset}, 0)$.
/// $\tau_j$ is `t[j]`, conjugated when `conj` is [`Conj::Yes`], which applies $H_j^H$ instead.
///
/// [`Direction::Forward`] computes $H_{d-1} \cdots H_0 A$ and [`Direction::Backward`] computes
/// $H_0 \cdots H_{d-1} A$, so applying a sequence forward with [`Conj::No`] and then backward
/// with [`Conj::Yes`] leaves `a` unchanged.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `h.ncols() != a.nrows()`, or if `t` is not a column vector
/// with one entry per reflector.
/// - [`Error::InvalidParameter`] if `params.blocksize` is zero.
///
/// # Panics
///
/// - Panics if the provided memory in `stack` is insufficient (see
/// [`apply_packed_reflectors_req`]).
#[track_caller]
pub fn apply_packed_reflectors<E: ComplexField>(
    conj: Conj,
    direction: Direction,
    offset: isize,
    h: MatRef<'_, E>,
    t: MatRef<'_, E>,
    a: MatMut<'_, E>,
    params: ReflectorParams,
    parallelism: Parallelism,
    stack: PodStack<'_>,
) -> Result<()> {
    let diag_len = check_reflector_args(
        "apply_packed_reflectors",
        (h.nrows(), h.ncols()),
        offset,
        (t.nrows(), t.ncols()),
        a.nrows(),
        params,
    )?;

    let mut a = a;
    let mut stack = stack;
    let n_h = h.ncols();
    let n_a = a.ncols();
    let i_off = (-offset).max(0) as usize;
    let j_off = offset.max(0) as usize;
    let side = triangle_of(direction);

    for k in block_starts(diag_len, params.blocksize, direction) {
        let nb = Ord::min(params.blocksize, diag_len - k);
        let ki = k + i_off;
        let kj = k + j_off;
        let width = n_h - kj;

        let h_pan = h.submatrix(ki, kj, nb, width);
        let t1 = t.subrows(k, nb);
        let mut a_bot = a.rb_mut().subrows_mut(kj, width);

        let (mut v, stack) = temp_mat_uninit::<E>(nb, width, stack.rb_mut());
        let (mut s, stack) = temp_mat_uninit::<E>(nb, nb, stack);
        let (mut z, _) = temp_mat_uninit::<E>(nb, n_a, stack);

        conj_unit_upper(v.rb_mut(), h_pan);
        rank_k_update(s.rb_mut(), side, v.rb(), None, E::one(), parallelism);
        fix_diagonal(conj, t1, s.rb_mut());

        matmul(z.rb_mut(), v.rb(), a_bot.rb(), None, E::one(), parallelism);
        match direction {
            Direction::Forward => solve_lower_triangular_in_place(s.rb(), z.rb_mut(), parallelism),
            Direction::Backward => solve_upper_triangular_in_place(s.rb(), z.rb_mut(), parallelism),
        }
        matmul_with_conj(
            a_bot.rb_mut(),
            v.rb().transpose(),
            Conj::Yes,
            z.rb(),
            Conj::No,
            Some(E::one()),
            -E::one(),
            parallelism,
        );
    }

    Ok(())
}
