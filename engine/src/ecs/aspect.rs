//! Component filters deciding which entities a system tracks.

use fixedbitset::FixedBitSet;

use crate::ecs::component::Kind;

/// An immutable filter over component kinds: an entity matches when it has every kind in the
/// "all of" set and none of the kinds in the "none of" set.
///
/// An aspect with both sets empty is the empty aspect, which matches nothing. Systems built on it
/// never track entities automatically and keep their own references instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aspect {
    all: FixedBitSet,
    none: FixedBitSet,
}

impl Aspect {
    /// An aspect that matches nothing.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// An aspect requiring every kind in `kinds` and excluding none.
    pub fn for_all(kinds: impl IntoIterator<Item = Kind>) -> Self {
        Self {
            all: bits(kinds),
            none: FixedBitSet::new(),
        }
    }

    /// Extend this aspect so that entities with any kind in `kinds` are rejected.
    pub fn exclude(mut self, kinds: impl IntoIterator<Item = Kind>) -> Self {
        self.none.union_with(&bits(kinds));
        self
    }

    /// Returns true for the aspect that matches nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.all.is_clear() && self.none.is_clear()
    }

    /// Required kinds.
    pub fn required(&self) -> impl Iterator<Item = Kind> + '_ {
        self.all.ones().map(Kind::from)
    }

    /// Excluded kinds.
    pub fn excluded(&self) -> impl Iterator<Item = Kind> + '_ {
        self.none.ones().map(Kind::from)
    }

    /// Determine whether an entity with the given kind set is of interest.
    pub fn matches(&self, kinds: &FixedBitSet) -> bool {
        !self.is_empty() && self.all.is_subset(kinds) && self.none.is_disjoint(kinds)
    }
}

fn bits(kinds: impl IntoIterator<Item = Kind>) -> FixedBitSet {
    let mut set = FixedBitSet::new();
    for kind in kinds {
        set.grow(kind.index() + 1);
        set.insert(kind.index());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(ids: &[u32]) -> FixedBitSet {
        bits(ids.iter().copied().map(Kind::new))
    }

    #[test]
    fn all_of_requires_superset() {
        // Given
        let aspect = Aspect::for_all([Kind::new(0), Kind::new(2)]);

        // Then
        assert!(aspect.matches(&kinds(&[0, 2])));
        assert!(aspect.matches(&kinds(&[0, 1, 2, 5])));
        assert!(!aspect.matches(&kinds(&[0])));
        assert!(!aspect.matches(&kinds(&[])));
    }

    #[test]
    fn excluded_kinds_reject() {
        // Given
        let aspect = Aspect::for_all([Kind::new(0)]).exclude([Kind::new(3)]);

        // Then
        assert!(aspect.matches(&kinds(&[0, 1])));
        assert!(!aspect.matches(&kinds(&[0, 3])));
        assert_eq!(aspect.excluded().collect::<Vec<_>>(), vec![Kind::new(3)]);
    }

    #[test]
    fn exclusion_only_matches_entities_without_the_kind() {
        // Given
        let aspect = Aspect::empty().exclude([Kind::new(1)]);

        // Then
        assert!(!aspect.is_empty());
        assert!(aspect.matches(&kinds(&[0])));
        assert!(!aspect.matches(&kinds(&[1])));
    }

    #[test]
    fn empty_aspect_matches_nothing() {
        // Given
        let aspect = Aspect::empty();

        // Then
        assert!(aspect.is_empty());
        assert!(!aspect.matches(&kinds(&[])));
        assert!(!aspect.matches(&kinds(&[0, 1, 2])));
        assert!(Aspect::for_all([]).is_empty());
    }

    #[test]
    fn required_kinds_roundtrip() {
        // Given
        let aspect = Aspect::for_all([Kind::new(4), Kind::new(1), Kind::new(4)]);

        // Then
        assert_eq!(
            aspect.required().collect::<Vec<_>>(),
            vec![Kind::new(1), Kind::new(4)]
        );
    }
}
