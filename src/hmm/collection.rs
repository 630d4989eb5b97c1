use crate::quark::Quark;

use super::data::{AmbiguityClass, ClassId};

/// Registry of ambiguity classes, ids assigned in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    classes: Quark<AmbiguityClass>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `tags`, registering it first when unseen.
    pub fn class_id_of(&mut self, tags: &AmbiguityClass) -> ClassId {
        self.classes.find_or_insert(tags)
    }

    pub fn id(&self, tags: &AmbiguityClass) -> Option<ClassId> {
        self.classes.id(tags)
    }

    pub fn contains(&self, tags: &AmbiguityClass) -> bool {
        self.classes.contains(tags)
    }

    pub fn class_by_id(&self, id: ClassId) -> Option<&AmbiguityClass> {
        self.classes.get(id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClassId, &AmbiguityClass)> {
        self.classes.iter().enumerate()
    }

    /// Largest registered class that is a proper subset of `tags`.
    ///
    /// Classes are scanned in registry order and only a strictly larger
    /// candidate replaces the current one, so among equal sizes the first
    /// registered wins. `None` means no class qualified and the caller should
    /// fall back to the open class.
    pub fn find_similar(&self, tags: &AmbiguityClass) -> Option<ClassId> {
        let mut best: Option<(ClassId, usize)> = None;
        for (id, class) in self.iter() {
            let size = class.len();
            let best_size = best.map_or(0, |(_, s)| s);
            if size > best_size && size < tags.len() && class.is_subset(tags) {
                best = Some((id, size));
            }
        }
        best.map(|(id, _)| id)
    }
}

impl FromIterator<AmbiguityClass> for Collection {
    fn from_iter<I: IntoIterator<Item = AmbiguityClass>>(iter: I) -> Self {
        Self { classes: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(tags: &[usize]) -> AmbiguityClass {
        tags.iter().copied().collect()
    }

    #[test]
    fn ids_are_stable() {
        let mut output = Collection::new();
        assert_eq!(output.class_id_of(&class(&[1, 2])), 0);
        assert_eq!(output.class_id_of(&class(&[0])), 1);
        assert_eq!(output.class_id_of(&class(&[2, 1])), 0);
        assert!(output.contains(&class(&[0])));
        assert!(!output.contains(&class(&[0, 1])));
        assert_eq!(output.class_by_id(1), Some(&class(&[0])));
    }

    #[test]
    fn similar_class_prefers_first_among_equal_sizes() {
        let output: Collection = vec![class(&[0]), class(&[1, 2]), class(&[0, 3]), class(&[0, 1, 2, 3])].into_iter().collect();
        // [1, 2] and [0, 3] both fit with size 2; the earlier one wins
        assert_eq!(output.find_similar(&class(&[0, 1, 2, 3])), Some(1));
        assert_eq!(output.find_similar(&class(&[0, 3, 4])), Some(2));
        assert_eq!(output.find_similar(&class(&[4, 5])), None);
    }

    #[test]
    fn similar_class_is_a_proper_subset() {
        let output: Collection = vec![class(&[0, 1])].into_iter().collect();
        assert_eq!(output.find_similar(&class(&[0, 1])), None);
    }
}
