use std::collections::BTreeSet;

pub type Float = f64;

/// Dense tag id in `0..N`.
pub type Tag = usize;

/// Dense ambiguity class id in `0..M`.
pub type ClassId = usize;

/// Set of tags a surface form may carry.
pub type AmbiguityClass = BTreeSet<Tag>;

/// Forbids the trigram `(tagi, tagj, tagk)`, or when `tagk` is `None` every
/// trigram containing the bigram `(tagi, tagj)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForbidRule {
    pub tagi: Tag,
    pub tagj: Tag,
    pub tagk: Option<Tag>,
}

impl ForbidRule {
    pub fn pair(tagi: Tag, tagj: Tag) -> Self {
        Self { tagi, tagj, tagk: None }
    }

    pub fn triple(tagi: Tag, tagj: Tag, tagk: Tag) -> Self {
        Self { tagi, tagj, tagk: Some(tagk) }
    }
}

/// After `tagi` the next tag must be in `tagsj`; when `tagsk` is non-empty the
/// tag after that must be in `tagsk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforceRule {
    pub tagi: Tag,
    pub tagsj: Vec<Tag>,
    pub tagsk: Vec<Tag>,
}

