use std::{
    collections::{BTreeMap, HashMap},
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{
    data::{ClassId, Float, Tag},
    model::TaggerData,
};

/// Raw event counts gathered by initialization or one EM pass.
///
/// Fractional counts come from Baum-Welch; integral ones from counting a
/// tagged corpus. Saved as JSON with every map written as a list of
/// `[key, count]` entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCounts {
    /// Occurrences of each tag as the history of a bigram.
    #[serde(with = "entries")]
    pub tags: BTreeMap<Tag, Float>,
    /// Occurrences of each tag bigram; doubles as the history count of a trigram.
    #[serde(with = "entries")]
    pub tag_pairs: BTreeMap<(Tag, Tag), Float>,
    #[serde(with = "entries")]
    pub tag_triples: BTreeMap<(Tag, Tag, Tag), Float>,
    #[serde(with = "entries")]
    pub classes: BTreeMap<ClassId, Float>,
    /// Class `k` emitted by tag `i` after tag `j`, keyed `(j, i, k)`.
    #[serde(with = "entries")]
    pub class_pair_emissions: BTreeMap<(Tag, Tag, ClassId), Float>,
    /// Class `k` emitted by tag `i`, keyed `(i, k)`.
    #[serde(with = "entries")]
    pub class_emissions: BTreeMap<(Tag, ClassId), Float>,
    #[serde(with = "entries")]
    pub tag_pairs_for_emission: BTreeMap<(Tag, Tag), Float>,
    #[serde(with = "entries")]
    pub tags_for_emission: BTreeMap<Tag, Float>,
    pub corpus_length: usize,
}

mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let raw: Vec<(K, V)> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

#[inline]
pub(crate) fn add<K: Ord>(map: &mut BTreeMap<K, Float>, key: K, value: Float) {
    *map.entry(key).or_insert(0.0) += value;
}

fn merge_map<K: Ord + Copy>(into: &mut BTreeMap<K, Float>, from: &BTreeMap<K, Float>) {
    for (&k, &v) in from {
        add(into, k, v);
    }
}

impl EventCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every count of `other` to `self`.
    pub fn merge(&mut self, other: &EventCounts) {
        merge_map(&mut self.tags, &other.tags);
        merge_map(&mut self.tag_pairs, &other.tag_pairs);
        merge_map(&mut self.tag_triples, &other.tag_triples);
        merge_map(&mut self.classes, &other.classes);
        merge_map(&mut self.class_pair_emissions, &other.class_pair_emissions);
        merge_map(&mut self.class_emissions, &other.class_emissions);
        merge_map(&mut self.tag_pairs_for_emission, &other.tag_pairs_for_emission);
        merge_map(&mut self.tags_for_emission, &other.tags_for_emission);
        self.corpus_length += other.corpus_length;
    }

    pub fn save<W: Write>(&self, wtr: W) -> Result<()> {
        serde_json::to_writer(wtr, self)?;
        Ok(())
    }

    pub fn load<R: Read>(rdr: R) -> Result<Self> {
        Ok(serde_json::from_reader(rdr)?)
    }

    pub fn save_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut wtr = BufWriter::new(File::create(path)?);
        self.save(&mut wtr)?;
        wtr.flush()?;
        Ok(())
    }

    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(BufReader::new(File::open(path)?))
    }

    /// Checks every key against a model with `n` tags and `m` classes.
    fn check_bounds(&self, n: usize, m: usize) -> Result<()> {
        let bad_tag = self.tags.keys().chain(self.tags_for_emission.keys()).any(|&t| t >= n)
            || self.tag_pairs.keys().chain(self.tag_pairs_for_emission.keys()).any(|&(a, b)| a >= n || b >= n)
            || self.tag_triples.keys().any(|&(a, b, c)| a >= n || b >= n || c >= n)
            || self.class_emissions.keys().any(|&(i, _)| i >= n)
            || self.class_pair_emissions.keys().any(|&(j, i, _)| j >= n || i >= n);
        if bad_tag {
            return Err(Error::CountsMismatch(format!("tag id out of range (N = {n})")));
        }
        let bad_class = self.classes.keys().any(|&k| k >= m)
            || self.class_emissions.keys().any(|&(_, k)| k >= m)
            || self.class_pair_emissions.keys().any(|&(_, _, k)| k >= m);
        if bad_class {
            return Err(Error::CountsMismatch(format!("ambiguity class id out of range (M = {m})")));
        }
        Ok(())
    }
}

#[inline]
fn lambda(count: Float) -> Float {
    if count > 0.0 {
        count / (count + 1.0)
    } else {
        0.0
    }
}

/// Rewrites `A` and `B` of `td` from `counts`.
///
/// Each transition row blends the trigram relative frequency with a bigram
/// estimate, which in turn blends with the unigram one; the weight of the
/// higher order grows with its history count. Each emission blends
/// class-given-tag-pair with class-given-tag, falling back to the relative
/// frequency of the classes containing the tag. Every transition row and every
/// emission distribution sums to one; `B` stays zero outside classes holding
/// the emitting tag.
pub fn calculate_smoothed_parameters(td: &mut TaggerData, counts: &EventCounts) -> Result<()> {
    let n = td.n();
    let m = td.m();
    counts.check_bounds(n, m)?;
    log::info!(
        "smoothing {} tag triples, {} tag pairs and {} emissions over {} words",
        counts.tag_triples.len(),
        counts.tag_pairs.len(),
        counts.class_pair_emissions.len(),
        counts.corpus_length
    );

    let total: Float = counts.tags.values().sum();
    let unigram: Vec<Float> = (0..n)
        .map(|k| if total > 0.0 { counts.tags.get(&k).copied().unwrap_or(0.0) / total } else { 1.0 / n as Float })
        .collect();

    // bigram estimate per history tag, already blended with the unigram one
    let mut bigram = vec![0.0; n * n];
    for j in 0..n {
        let row = &mut bigram[j * n..(j + 1) * n];
        row.copy_from_slice(&unigram);
        let pairs = counts.tag_pairs.range((j, 0)..=(j, Tag::MAX));
        let sum: Float = pairs.clone().map(|(_, &c)| c).sum();
        if sum > 0.0 {
            let l = lambda(counts.tags.get(&j).copied().unwrap_or(0.0));
            row.iter_mut().for_each(|p| *p *= 1.0 - l);
            for (&(_, k), &c) in pairs {
                row[k] += l * c / sum;
            }
        }
    }

    for i in 0..n {
        for j in 0..n {
            let base = &bigram[j * n..(j + 1) * n];
            let triples = counts.tag_triples.range((i, j, 0)..=(i, j, Tag::MAX));
            let sum: Float = triples.clone().map(|(_, &c)| c).sum();
            let row = td.a_row_mut(i, j);
            row.copy_from_slice(base);
            if sum > 0.0 {
                let l = lambda(counts.tag_pairs.get(&(i, j)).copied().unwrap_or(0.0));
                row.iter_mut().for_each(|p| *p *= 1.0 - l);
                for (&(_, _, k), &c) in triples {
                    row[k] += l * c / sum;
                }
            }
        }
    }

    let mut classes_with: Vec<Vec<ClassId>> = vec![Vec::new(); n];
    for (k, class) in td.output().iter() {
        for &i in class {
            classes_with[i].push(k);
        }
    }

    td.clear_b();
    let mut emission: HashMap<ClassId, Float> = HashMap::new();
    for (i, ks) in classes_with.iter().enumerate() {
        if ks.is_empty() {
            continue;
        }
        // class given tag
        let class_total: Float = ks.iter().map(|k| counts.classes.get(k).copied().unwrap_or(0.0)).sum();
        let mut given_tag: Vec<Float> = ks
            .iter()
            .map(|k| {
                if class_total > 0.0 {
                    counts.classes.get(k).copied().unwrap_or(0.0) / class_total
                } else {
                    1.0 / ks.len() as Float
                }
            })
            .collect();
        let tag_sum: Float = ks.iter().map(|&k| counts.class_emissions.get(&(i, k)).copied().unwrap_or(0.0)).sum();
        if tag_sum > 0.0 {
            let l = lambda(counts.tags_for_emission.get(&i).copied().unwrap_or(0.0));
            for (p, &k) in given_tag.iter_mut().zip(ks) {
                *p = l * counts.class_emissions.get(&(i, k)).copied().unwrap_or(0.0) / tag_sum + (1.0 - l) * *p;
            }
        }

        for j in 0..n {
            let pair_sum: Float =
                ks.iter().map(|&k| counts.class_pair_emissions.get(&(j, i, k)).copied().unwrap_or(0.0)).sum();
            let l = lambda(counts.tag_pairs_for_emission.get(&(j, i)).copied().unwrap_or(0.0));
            emission.clear();
            for (&p, &k) in given_tag.iter().zip(ks) {
                let value = if pair_sum > 0.0 {
                    l * counts.class_pair_emissions.get(&(j, i, k)).copied().unwrap_or(0.0) / pair_sum + (1.0 - l) * p
                } else {
                    p
                };
                emission.insert(k, value);
            }
            for (&k, &value) in &emission {
                td.set_b(j, i, k, value);
            }
        }
    }
    Ok(())
}
