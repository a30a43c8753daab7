use super::*;

/// Returns the largest modulus over the elements of `mat`.
pub fn norm_max<E: ComplexField>(mat: MatRef<'_, E>) -> E::Real {
    let mut acc = E::Real::zero();
    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            acc = acc.max(unsafe { mat.read_unchecked(i, j) }.abs());
        }
    }
    acc
}
