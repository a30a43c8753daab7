use super::*;

/// Returns the one-norm of `mat`: the largest sum of moduli over the columns.
pub fn norm_one<E: ComplexField>(mat: MatRef<'_, E>) -> E::Real {
    let mut acc = E::Real::zero();
    for j in 0..mat.ncols() {
        let mut sum = E::Real::zero();
        for i in 0..mat.nrows() {
            sum += unsafe { mat.read_unchecked(i, j) }.abs();
        }
        acc = acc.max(sum);
    }
    acc
}
