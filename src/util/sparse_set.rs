use crate::util::primitives::StateID;

/// An insertion ordered set of states with constant time insertion,
/// membership testing and clearing.
///
/// The PikeVM uses one to remember which ops already hold a thread at the
/// current position, and subset construction uses one to collect epsilon
/// closures. Iteration yields elements in the order in which they were
/// inserted, which is what keeps PikeVM threads in priority order.
///
/// The data structure is based on: https://research.swtch.com/sparse
#[derive(Clone)]
pub(crate) struct SparseSet {
    /// The number of elements currently in this set.
    len: usize,
    /// The members, in insertion order.
    dense: Vec<StateID>,
    /// Maps a member to its position in `dense`.
    ///
    /// A state ID is in the set if and only if
    /// sparse[id] < len && id == dense[sparse[id]].
    sparse: Vec<StateID>,
}

impl SparseSet {
    /// Create a new sparse set able to hold IDs below `capacity`.
    ///
    /// This panics if the capacity given is bigger than `StateID::LIMIT`.
    pub(crate) fn new(capacity: usize) -> SparseSet {
        assert!(
            capacity <= StateID::LIMIT,
            "sparse set capacity cannot exceed {:?}",
            StateID::LIMIT
        );
        SparseSet {
            len: 0,
            dense: vec![StateID::ZERO; capacity],
            sparse: vec![StateID::ZERO; capacity],
        }
    }

    /// Insert `value` and return true if it was not already a member.
    ///
    /// Panics if `value` is not below the capacity.
    #[inline(always)]
    pub(crate) fn insert(&mut self, value: StateID) -> bool {
        if self.contains(value) {
            return false;
        }
        let id = StateID::new_unchecked(self.len);
        self.dense[id] = value;
        self.sparse[value] = id;
        self.len += 1;
        true
    }

    #[inline]
    pub(crate) fn contains(&self, value: StateID) -> bool {
        let i = self.sparse[value];
        i.as_usize() < self.len && self.dense[i] == value
    }

    #[inline]
    pub(crate) fn clear(&mut self) {
        self.len = 0;
    }

    /// Returns the members of this set, in insertion order.
    #[inline]
    pub(crate) fn as_slice(&self) -> &[StateID] {
        &self.dense[..self.len]
    }
}

impl core::fmt::Debug for SparseSet {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_tuple("SparseSet").field(&self.as_slice()).finish()
    }
}
