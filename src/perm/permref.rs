use super::*;
use crate::assert;

/// Immutable permutation view.
///
/// `forward[i]` is the position that row `i` is moved to, and `inverse[i]` is the row that ends
/// up at position `i`.
#[derive(Debug)]
pub struct PermRef<'a> {
    pub(super) forward: &'a [usize],
    pub(super) inverse: &'a [usize],
}

impl Copy for PermRef<'_> {}
impl Clone for PermRef<'_> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'short> Reborrow<'short> for PermRef<'_> {
    type Target = PermRef<'short>;

    #[inline]
    fn rb(&'short self) -> Self::Target {
        *self
    }
}

impl<'a> PermRef<'a> {
    /// Creates a new permutation, by checking the validity of the inputs.
    ///
    /// # Panics
    ///
    /// The function panics if `forward` and `inverse` do not have the same length, are not valid
    /// permutations, or are not inverse permutations of each other.
    #[inline]
    #[track_caller]
    pub fn new_checked(forward: &'a [usize], inverse: &'a [usize]) -> Self {
        let n = forward.len();
        assert!(forward.len() == inverse.len());
        for (i, &p) in forward.iter().enumerate() {
            assert!(p < n);
            assert!(inverse[p] == i);
        }
        Self { forward, inverse }
    }

    /// Creates a new permutation reference, without checking that the inputs are inverse
    /// permutations of each other.
    ///
    /// # Safety
    ///
    /// `forward` and `inverse` must be valid permutations, and be inverse permutations of each
    /// other.
    #[inline]
    #[track_caller]
    pub unsafe fn new_unchecked(forward: &'a [usize], inverse: &'a [usize]) -> Self {
        assert!(forward.len() == inverse.len());
        Self { forward, inverse }
    }

    /// Returns the permutation as a pair of arrays, `(forward, inverse)`.
    #[inline]
    pub fn arrays(self) -> (&'a [usize], &'a [usize]) {
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

    /// Returns an owning copy of the permutation.
    #[inline]
    pub fn to_owned(self) -> Perm {
        Perm {
            forward: self.forward.into(),
            inverse: self.inverse.into(),
        }
    }
}
