use std::{borrow::Borrow, collections::HashMap, hash::Hash};

/// Append-only bijection between keys and dense ids `0..len`.
///
/// Ids are assigned in insertion order and never change.
#[derive(Debug, Clone)]
pub struct Quark<K = String> {
    v: Vec<K>,
    m: HashMap<K, usize>,
}

impl<K> Default for Quark<K> {
    fn default() -> Self {
        Self { v: Vec::new(), m: HashMap::new() }
    }
}

impl<K: Clone + Eq + Hash> Quark<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_or_insert(&mut self, key: &K) -> usize {
        if let Some(&id) = self.m.get(key) {
            return id;
        }
        let idx = self.v.len();
        self.m.insert(key.clone(), idx);
        self.v.push(key.clone());
        idx
    }

    pub fn id<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.m.get(key).copied()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.m.contains_key(key)
    }

    pub fn get(&self, id: usize) -> Option<&K> {
        self.v.get(id)
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.v.iter()
    }
}

impl<K: Clone + Eq + Hash> FromIterator<K> for Quark<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut quark = Self::default();
        for key in iter {
            quark.find_or_insert(&key);
        }
        quark
    }
}

impl<K: Eq + Hash> PartialEq for Quark<K> {
    fn eq(&self, other: &Self) -> bool {
        self.v == other.v
    }
}

impl<K: Eq + Hash> Eq for Quark<K> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_key() {
        let mut quark = Quark::default();
        for (s, id) in [("zero", 0), ("one", 1), ("two", 2), ("three", 3), ("two", 2), ("one", 1), ("zero", 0), ("four", 4)] {
            assert_eq!(id, quark.find_or_insert(&s.to_string()), "{} != {}", s, id);
        }
        assert_eq!(quark.id("three"), Some(3));
        assert_eq!(quark.id("five"), None);
    }

    #[test]
    fn find_by_id() {
        let quark: Quark = ["zero", "one", "zero"].iter().map(|s| s.to_string()).collect();
        assert_eq!(quark.len(), 2);
        assert_eq!(quark.get(0).map(String::as_str), Some("zero"));
        assert_eq!(quark.get(1).map(String::as_str), Some("one"));
        assert_eq!(quark.get(2), None);
    }
}
