use super::*;
use crate::assert;

/// Owning permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perm {
    pub(super) forward: Box<[usize]>,
    pub(super) inverse: Box<[usize]>,
}

impl Perm {
    /// Returns the identity permutation of dimension `n`.
    #[inline]
    pub fn identity(n: usize) -> Self {
        let forward: Box<[usize]> = (0..n).collect();
        Self {
            inverse: forward.clone(),
            forward,
        }
    }

    /// Creates a new permutation, by checking the validity of the inputs.
    ///
    /// # Panics
    ///
    /// See [`PermRef::new_checked`].
    #[inline]
    #[track_caller]
    pub fn new_checked(forward: Box<[usize]>, inverse: Box<[usize]>) -> Self {
        PermRef::new_checked(&forward, &inverse);
        Self { forward, inverse }
    }

    /// Creates the permutation from its forward array, computing the inverse.
    ///
    /// # Panics
    ///
    /// The function panics if `forward` is not a permutation.
    #[track_caller]
    pub fn from_forward(forward: Box<[usize]>) -> Self {
        let n = forward.len();
        let mut inverse = vec![usize::MAX; n].into_boxed_slice();
        for (i, &p) in forward.iter().enumerate() {
            assert!(p < n);
            assert!(inverse[p] == usize::MAX);
            inverse[p] = i;
        }
        Self { forward, inverse }
    }

    /// Convert `self` to a permutation view.
    #[inline]
    pub fn as_ref(&self) -> PermRef<'_> {
        PermRef {
            forward: &self.forward,
            inverse: &self.inverse,
        }
    }

    /// Returns the permutation as a pair of arrays, `(forward, inverse)`.
    #[inline]
    pub fn into_arrays(self) -> (Box<[usize]>, Box<[usize]>) {
        (self.forward, self.inverse)
    }

    /// Returns the dimension of the permutation.
    #[inline]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns `true` if the permutation is of dimension zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Returns the inverse permutation.
    #[inline]
    pub fn inverse(self) -> Self {
        Self {
            forward: self.inverse,
            inverse: self.forward,
        }
    }
}
