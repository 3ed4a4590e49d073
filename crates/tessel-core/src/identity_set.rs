// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Set of record identities ordered by type, then id.
use std::collections::BTreeSet;

use crate::ident::RecordIdentity;

/// Identity set used to diff relationship memberships without pairwise scans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordIdentitySet {
    members: BTreeSet<RecordIdentity>,
}

impl RecordIdentitySet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `identity`; returns `false` if it was already present.
    pub fn add(&mut self, identity: RecordIdentity) -> bool {
        self.members.insert(identity)
    }

    /// Removes `identity`; returns `false` if it was absent.
    pub fn remove(&mut self, identity: &RecordIdentity) -> bool {
        self.members.remove(identity)
    }

    /// Membership test.
    #[must_use]
    pub fn has(&self, identity: &RecordIdentity) -> bool {
        self.members.contains(identity)
    }

    /// Iterates members in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordIdentity> {
        self.members.iter()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// `true` when the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members of `self` that are not in `other`, in identity order.
    #[must_use]
    pub fn exclusive_of(&self, other: &Self) -> Vec<RecordIdentity> {
        self.members.difference(&other.members).cloned().collect()
    }
}

impl FromIterator<RecordIdentity> for RecordIdentitySet {
    fn from_iter<I: IntoIterator<Item = RecordIdentity>>(iter: I) -> Self {
        let mut set = Self::new();
        for identity in iter {
            set.add(identity);
        }
        set
    }
}

impl<'a> FromIterator<&'a RecordIdentity> for RecordIdentitySet {
    fn from_iter<I: IntoIterator<Item = &'a RecordIdentity>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moon(id: &str) -> RecordIdentity {
        RecordIdentity::new("moon", id)
    }

    #[test]
    fn add_is_idempotent() {
        let mut set = RecordIdentitySet::new();
        assert!(set.add(moon("io")));
        assert!(!set.add(moon("io")));
        assert_eq!(set.len(), 1);
        assert!(set.has(&moon("io")));
        assert!(set.remove(&moon("io")));
        assert!(!set.remove(&moon("io")));
        assert!(set.is_empty());
    }

    #[test]
    fn exclusive_of_is_one_sided_difference() {
        let current: RecordIdentitySet = [moon("m1"), moon("m2")].into_iter().collect();
        let next: RecordIdentitySet = [moon("m2"), moon("m3")].into_iter().collect();
        assert_eq!(next.exclusive_of(&current), vec![moon("m3")]);
        assert_eq!(current.exclusive_of(&next), vec![moon("m1")]);
        assert!(current.exclusive_of(&current).is_empty());
    }

    #[test]
    fn colons_in_type_names_do_not_alias() {
        let a = RecordIdentity::new("a:b", "c");
        let b = RecordIdentity::new("a", "b:c");
        assert_eq!(a.key(), b.key());

        let set: RecordIdentitySet = [a.clone()].into_iter().collect();
        assert!(set.has(&a));
        assert!(!set.has(&b));
        let both: RecordIdentitySet = [a, b.clone()].into_iter().collect();
        assert_eq!(both.len(), 2);
        assert_eq!(both.exclusive_of(&set), vec![b]);
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a: RecordIdentitySet = [moon("a"), moon("b")].into_iter().collect();
        let b: RecordIdentitySet = [moon("b"), moon("a")].into_iter().collect();
        assert_eq!(a, b);
    }
}
