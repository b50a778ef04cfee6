//! Provides a SparseSet over instruction ids as an alternative to HashSets.
//!
//! Membership checks and inserts are constant time and `clear` is constant
//! time regardless of occupancy, which is what the thread-list dedup in the
//! evaluation loop needs: the set is cleared once per input position.

pub(crate) struct SparseSet {
    len: usize,
    dense: Vec<usize>,
    sparse: Vec<usize>,
}

impl SparseSet {
    /// Initializes a new set taking a value representing the maximum size of
    /// the set, typically the instruction count of a program.
    #[must_use]
    pub(crate) fn new(max_len: usize) -> Self {
        Self {
            len: 0,
            dense: Vec::with_capacity(max_len),
            sparse: vec![0; max_len],
        }
    }

    /// Inserts a value into the set, returning `false` if the value was
    /// already a member.
    pub(crate) fn insert(&mut self, val: usize) -> bool {
        if self.contains(val) {
            return false;
        }

        if self.sparse.len() <= val {
            self.sparse.resize(val + 1, 0);
        }

        self.sparse[val] = self.len;
        if self.dense.len() == self.len {
            self.dense.push(val);
        } else {
            self.dense[self.len] = val;
        }
        self.len += 1;

        true
    }

    /// Returns `true` if the set contains a value.
    pub(crate) fn contains(&self, val: usize) -> bool {
        self.sparse
            .get(val)
            .map(|&dense_idx| dense_idx < self.len && self.dense[dense_idx] == val)
            // out of the bounds of the set, thus not a member.
            .unwrap_or(false)
    }

    /// Clears the set, removing all values.
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }
}

impl core::fmt::Debug for SparseSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SparseSet({:?})", &self.dense[..self.len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_track_membership_after_insert() {
        let mut set = SparseSet::new(8);

        assert!(set.insert(3));
        assert!(set.contains(3));
        assert!(!set.contains(4));

        // a second insert of the same value is a no-op.
        assert!(!set.insert(3));
    }

    #[test]
    fn should_invalidate_all_members_on_clear() {
        let mut set = SparseSet::new(4);

        set.insert(0);
        set.insert(2);

        set.clear();
        assert!(!set.contains(0));
        assert!(!set.contains(2));
    }

    #[test]
    fn should_grow_when_value_exceeds_initial_bounds() {
        let mut set = SparseSet::new(0);

        set.insert(10);
        assert!(set.contains(10));
        assert!(!set.contains(9));
    }
}
