use super::*;

/// Returns the Frobenius norm of `mat`.
///
/// The sum of squares is accumulated with a running scale factor, so that the result does not
/// overflow or underflow unless the norm itself does.
pub fn norm_frobenius<E: ComplexField>(mat: MatRef<'_, E>) -> E::Real {
    let zero = E::Real::zero();
    let one = E::Real::one();

    let mut scale = zero;
    let mut ssq = one;

    let mut push = |x: E::Real| {
        if x != zero {
            let a = x.abs();
            if scale < a {
                let r = scale / a;
                ssq = one + ssq * r * r;
                scale = a;
            } else {
                let r = a / scale;
                ssq += r * r;
            }
        }
    };

    for j in 0..mat.ncols() {
        for i in 0..mat.nrows() {
            let v = unsafe { mat.read_unchecked(i, j) };
            push(v.real());
            push(v.imag());
        }
    }

    scale * ssq.sqrt()
}
