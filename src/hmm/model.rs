use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
};

use crate::{error::Result, quark::Quark};

use super::{
    collection::Collection,
    data::{AmbiguityClass, ClassId, EnforceRule, Float, ForbidRule, Tag},
};

/// Everything a trigram tagger needs at training and tagging time.
///
/// Holds the tag inventory, the linguistic rules, the ambiguity class
/// registry, and the two probability tensors:
///
/// * `A[i][j][k]`, the probability of tag `k` after tags `i, j`, stored as a
///   dense `[N][N][N]` row-major buffer;
/// * `B[j][i][k]`, the probability that a word tagged `i` after tag `j`
///   carries ambiguity class `k`, stored sparsely because it is zero whenever
///   class `k` does not contain `i`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaggerData {
    open_class: AmbiguityClass,
    forbid_rules: Vec<ForbidRule>,
    tags: Quark<String>,
    enforce_rules: Vec<EnforceRule>,
    prefer_rules: Vec<String>,
    constants: BTreeMap<String, u32>,
    output: Collection,
    n: usize,
    m: usize,
    a: Vec<Float>,
    b: HashMap<(Tag, Tag, ClassId), Float>,
    patterns: Vec<u8>,
    discard: Vec<String>,
}

impl TaggerData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes `A` to `N³` and empties `B`; all probabilities become zero.
    pub fn allocate(&mut self, n: usize, m: usize) {
        self.n = n;
        self.m = m;
        self.a = vec![0.0; n * n * n];
        self.b = HashMap::new();
    }

    /// Number of states (tags) the tensors are sized for.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of ambiguity classes the tensors are sized for.
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    fn offset(&self, i: Tag, j: Tag) -> usize {
        (i * self.n + j) * self.n
    }

    #[inline]
    pub fn a(&self, i: Tag, j: Tag, k: Tag) -> Float {
        self.a[self.offset(i, j) + k]
    }

    #[inline]
    pub fn set_a(&mut self, i: Tag, j: Tag, k: Tag, value: Float) {
        let offset = self.offset(i, j);
        self.a[offset + k] = value;
    }

    /// Distribution over the tag following `(i, j)`.
    pub fn a_row(&self, i: Tag, j: Tag) -> &[Float] {
        let offset = self.offset(i, j);
        &self.a[offset..offset + self.n]
    }

    pub fn a_row_mut(&mut self, i: Tag, j: Tag) -> &mut [Float] {
        let offset = self.offset(i, j);
        &mut self.a[offset..offset + self.n]
    }

    pub(crate) fn a_slice(&self) -> &[Float] {
        &self.a
    }

    /// Takes a fully read `A` buffer of `n³` cells; `B` starts empty.
    pub(crate) fn install_a(&mut self, n: usize, m: usize, a: Vec<Float>) {
        debug_assert_eq!(Some(a.len()), n.checked_mul(n).and_then(|nn| nn.checked_mul(n)));
        self.n = n;
        self.m = m;
        self.a = a;
        self.b = HashMap::new();
    }

    #[inline]
    pub fn b(&self, j: Tag, i: Tag, k: ClassId) -> Float {
        self.b.get(&(j, i, k)).copied().unwrap_or(0.0)
    }

    /// Stores `B[j][i][k]`; a zero removes the entry.
    pub fn set_b(&mut self, j: Tag, i: Tag, k: ClassId, value: Float) {
        if value == 0.0 {
            self.b.remove(&(j, i, k));
        } else {
            self.b.insert((j, i, k), value);
        }
    }

    /// Nonzero emission entries in `(j, i, k)` order.
    pub fn b_entries(&self) -> Vec<((Tag, Tag, ClassId), Float)> {
        let mut entries: Vec<_> = self.b.iter().map(|(&key, &value)| (key, value)).collect();
        entries.sort_by_key(|&(key, _)| key);
        entries
    }

    pub fn clear_b(&mut self) {
        self.b.clear();
    }

    pub fn open_class(&self) -> &AmbiguityClass {
        &self.open_class
    }

    pub fn set_open_class(&mut self, open_class: AmbiguityClass) {
        self.open_class = open_class;
    }

    pub fn forbid_rules(&self) -> &[ForbidRule] {
        &self.forbid_rules
    }

    pub fn set_forbid_rules(&mut self, rules: Vec<ForbidRule>) {
        self.forbid_rules = rules;
    }

    pub fn enforce_rules(&self) -> &[EnforceRule] {
        &self.enforce_rules
    }

    pub fn set_enforce_rules(&mut self, rules: Vec<EnforceRule>) {
        self.enforce_rules = rules;
    }

    pub fn prefer_rules(&self) -> &[String] {
        &self.prefer_rules
    }

    pub fn set_prefer_rules(&mut self, rules: Vec<String>) {
        self.prefer_rules = rules;
    }

    pub fn constants(&self) -> &BTreeMap<String, u32> {
        &self.constants
    }

    pub fn set_constants(&mut self, constants: BTreeMap<String, u32>) {
        self.constants = constants;
    }

    pub fn discard(&self) -> &[String] {
        &self.discard
    }

    pub fn set_discard(&mut self, discard: Vec<String>) {
        self.discard = discard;
    }

    /// Opaque pattern matcher bytes carried for the morphological front end.
    pub fn patterns(&self) -> &[u8] {
        &self.patterns
    }

    pub fn set_patterns(&mut self, patterns: Vec<u8>) {
        self.patterns = patterns;
    }

    /// Registers a tag name and returns its id.
    pub fn add_tag(&mut self, name: &str) -> Tag {
        self.tags.find_or_insert(&name.to_string())
    }

    pub fn tag_id(&self, name: &str) -> Option<Tag> {
        self.tags.id(name)
    }

    pub fn tag_name(&self, tag: Tag) -> Option<&str> {
        self.tags.get(tag).map(String::as_str)
    }

    pub fn num_tags(&self) -> usize {
        self.tags.len()
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn output(&self) -> &Collection {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut Collection {
        &mut self.output
    }

    pub fn set_output(&mut self, output: Collection) {
        self.output = output;
    }

    /// Tag names of `class` separated by blanks.
    pub fn class_names(&self, class: &AmbiguityClass) -> String {
        class
            .iter()
            .map(|&t| self.tag_name(t).map(str::to_string).unwrap_or_else(|| format!("#{t}")))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Writes ambiguity classes and both tensors in readable form.
    pub fn dump<W: Write>(&self, wtr: &mut W) -> Result<()> {
        writeln!(wtr, "AMBIGUITY CLASSES")?;
        for (k, class) in self.output.iter() {
            writeln!(wtr, "{k}: {}", self.class_names(class))?;
        }
        writeln!(wtr, "\nTRANSITIONS")?;
        for i in 0..self.n {
            for j in 0..self.n {
                for (k, &p) in self.a_row(i, j).iter().enumerate() {
                    if p > 0.0 {
                        writeln!(wtr, "A[{}][{}][{}] = {p}", self.name_or_id(i), self.name_or_id(j), self.name_or_id(k))?;
                    }
                }
            }
        }
        writeln!(wtr, "\nEMISSIONS")?;
        for ((j, i, k), p) in self.b_entries() {
            writeln!(wtr, "B[{}][{}][{k}] = {p}", self.name_or_id(j), self.name_or_id(i))?;
        }
        Ok(())
    }

    fn name_or_id(&self, tag: Tag) -> String {
        self.tag_name(tag).map(str::to_string).unwrap_or_else(|| tag.to_string())
    }
}
