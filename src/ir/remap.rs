//! Sequential identifier remapping.
//!
//! Merging two independently annotated datasets needs every record of each
//! input to receive a new id from one shared, contiguous id space. An
//! [`IdRemap`] records that assignment for one input so its foreign keys can
//! be rewritten through the same table.

use std::collections::HashMap;
use std::hash::Hash;

/// Maps old ids to new ids assigned consecutively from a starting value.
#[derive(Clone, Debug)]
pub struct IdRemap<K> {
    table: HashMap<K, K>,
    first: u64,
    next: u64,
}

impl<K> IdRemap<K>
where
    K: Copy + Eq + Hash + From<u64>,
{
    /// Creates an empty remap whose first assigned id is `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            table: HashMap::new(),
            first,
            next: first,
        }
    }

    /// Assigns new ids to `old_ids` in iteration order.
    ///
    /// Fails with the offending id if `old_ids` repeats a value, since a
    /// repeated key would make foreign keys ambiguous.
    pub fn sequential(first: u64, old_ids: impl IntoIterator<Item = K>) -> Result<Self, K> {
        let mut remap = Self::starting_at(first);
        for old in old_ids {
            remap.assign(old)?;
        }
        Ok(remap)
    }

    /// Assigns the next id to `old`. Fails if `old` was already assigned.
    pub fn assign(&mut self, old: K) -> Result<K, K> {
        if self.table.contains_key(&old) {
            return Err(old);
        }
        let new = K::from(self.next);
        self.table.insert(old, new);
        self.next += 1;
        Ok(new)
    }

    /// New id for `old`, if one was assigned.
    pub fn get(&self, old: K) -> Option<K> {
        self.table.get(&old).copied()
    }

    /// Number of ids assigned so far.
    pub fn len(&self) -> usize {
        (self.next - self.first) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next == self.first
    }

    /// The id the next call to [`IdRemap::assign`] would hand out.
    pub fn next_id(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ImageId;

    #[test]
    fn assigns_in_iteration_order() {
        let remap =
            IdRemap::sequential(4, [ImageId(10), ImageId(2), ImageId(7)]).expect("unique ids");

        assert_eq!(remap.get(ImageId(10)), Some(ImageId(4)));
        assert_eq!(remap.get(ImageId(2)), Some(ImageId(5)));
        assert_eq!(remap.get(ImageId(7)), Some(ImageId(6)));
        assert_eq!(remap.get(ImageId(1)), None);
        assert_eq!(remap.len(), 3);
        assert_eq!(remap.next_id(), 7);
    }

    #[test]
    fn rejects_repeated_ids() {
        let err = IdRemap::sequential(1, [ImageId(1), ImageId(2), ImageId(1)]).unwrap_err();
        assert_eq!(err, ImageId(1));
    }

    #[test]
    fn empty_remap_keeps_start() {
        let remap: IdRemap<ImageId> = IdRemap::sequential(9, []).expect("empty");
        assert!(remap.is_empty());
        assert_eq!(remap.next_id(), 9);
    }
}
