use std::collections::BTreeMap;

use crate::{
    config::Symbols,
    error::{Error, Result},
    stream::{TaggerWord, WordSource},
};

use super::{
    data::{AmbiguityClass, ClassId, Float, Tag},
    model::TaggerData,
    smooth::{add, EventCounts},
};

/// Diagnostics of an initialization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitStats {
    pub words: usize,
    pub unknown_words: usize,
    /// Words of the tagged corpus carrying more than one tag.
    pub ambiguous_gold_tags: usize,
    /// Gold tags absent from the class of the aligned untagged word.
    pub emission_mismatches: usize,
}

fn class_of(td: &TaggerData, word: &TaggerWord, stats: &mut InitStats) -> Result<(AmbiguityClass, ClassId)> {
    let mut tags = word.tags();
    if tags.is_empty() {
        tags = td.open_class().clone();
        stats.unknown_words += 1;
    }
    match td.output().id(&tags) {
        Some(k) => Ok((tags, k)),
        None => Err(Error::UnknownAmbiguityClass { surface: word.surface.clone(), tags: td.class_names(&tags) }),
    }
}

/// Heuristic counts from ambiguity class co-occurrences.
///
/// Every class, class bigram and class trigram of the corpus is counted, and
/// each count is spread evenly over the tag tuples the classes admit.
pub fn kupiec_counts<S: WordSource>(
    td: &TaggerData,
    symbols: Symbols,
    corpus_length: Option<usize>,
    mut corpus: S,
) -> Result<(EventCounts, InitStats)> {
    let mut stats = InitStats::default();
    let eos_class = AmbiguityClass::from([symbols.eos]);
    let eos = td.output().id(&eos_class).ok_or_else(|| Error::UnknownAmbiguityClass {
        surface: String::new(),
        tags: td.class_names(&eos_class),
    })?;

    let mut classes: BTreeMap<ClassId, Float> = BTreeMap::new();
    let mut class_pairs: BTreeMap<(ClassId, ClassId), Float> = BTreeMap::new();
    let mut class_triples: BTreeMap<(ClassId, ClassId, ClassId), Float> = BTreeMap::new();

    add(&mut classes, eos, 1.0);
    let (mut k1, mut k2) = (None, eos);
    while let Some(word) = corpus.next_word()? {
        stats.words += 1;
        let (tags, k3) = class_of(td, &word, &mut stats)?;
        add(&mut classes, k3, 1.0);
        add(&mut class_pairs, (k2, k3), 1.0);
        if let Some(k1) = k1 {
            add(&mut class_triples, (k1, k2, k3), 1.0);
        }
        k1 = Some(k2);
        k2 = k3;
        if let Some(limit) = corpus_length {
            if stats.words >= limit && tags == eos_class {
                log::info!("corpus length cutoff reached after {} words", stats.words);
                break;
            }
        }
    }

    let output = td.output();
    let class = |k: ClassId| output.class_by_id(k).cloned().unwrap_or_default();
    let mut counts = EventCounts::new();

    for (&(c1, c2, c3), &count) in &class_triples {
        let (s1, s2, s3) = (class(c1), class(c2), class(c3));
        let share = count / (s1.len() * s2.len() * s3.len()) as Float;
        for &t1 in &s1 {
            for &t2 in &s2 {
                for &t3 in &s3 {
                    add(&mut counts.tag_triples, (t1, t2, t3), share);
                    add(&mut counts.tag_pairs, (t1, t2), share);
                    add(&mut counts.tags, t1, share);
                }
            }
        }
    }

    for (&(c1, c2), &count) in &class_pairs {
        let (s1, s2) = (class(c1), class(c2));
        let share = count / (s1.len() * s2.len()) as Float;
        for &t1 in &s1 {
            for &t2 in &s2 {
                add(&mut counts.class_pair_emissions, (t1, t2, c2), share);
                add(&mut counts.tag_pairs_for_emission, (t1, t2), share);
            }
        }
    }

    for (&k, &count) in &classes {
        let s = class(k);
        let share = count / s.len().max(1) as Float;
        for &t in &s {
            add(&mut counts.class_emissions, (t, k), share);
            add(&mut counts.tags_for_emission, t, share);
        }
    }
    counts.classes = classes;
    counts.corpus_length = stats.words;
    log::info!(
        "{} words ({} unknown), {} class pairs, {} class triples",
        stats.words,
        stats.unknown_words,
        class_pairs.len(),
        class_triples.len()
    );
    Ok((counts, stats))
}

/// Exact counts from a hand-tagged corpus aligned with its untagged analysis.
pub fn tagged_counts<S: WordSource, U: WordSource>(
    td: &TaggerData,
    symbols: Symbols,
    mut tagged: S,
    mut untagged: U,
) -> Result<(EventCounts, InitStats)> {
    let mut stats = InitStats::default();
    let mut counts = EventCounts::new();
    let (mut tag1, mut tag2): (Option<Tag>, Option<Tag>) = (Some(symbols.eos), Some(symbols.eos));

    while let Some(gold) = tagged.next_word()? {
        let word = untagged.next_word()?.ok_or_else(|| Error::StreamMisalignment {
            tagged: gold.surface.clone(),
            untagged: "<end of corpus>".to_string(),
        })?;
        if gold.surface != word.surface {
            return Err(Error::StreamMisalignment { tagged: gold.surface, untagged: word.surface });
        }
        stats.words += 1;

        let tag3 = tag2;
        tag2 = tag1;
        let gold_tags = gold.tags();
        if gold_tags.len() > 1 {
            stats.ambiguous_gold_tags += 1;
            log::warn!("tagged corpus word '{}' is ambiguous: {}", gold.surface, td.class_names(&gold_tags));
        }
        tag1 = gold.analyses.first().map(|a| a.tag);

        if let (Some(t3), Some(t2), Some(t1)) = (tag3, tag2, tag1) {
            add(&mut counts.tag_triples, (t3, t2, t1), 1.0);
            add(&mut counts.tag_pairs, (t3, t2), 1.0);
            add(&mut counts.tags, t3, 1.0);
        }

        let (tags, k) = class_of(td, &word, &mut stats)?;
        if let (Some(t2), Some(t1)) = (tag2, tag1) {
            if tags.contains(&t1) {
                add(&mut counts.class_pair_emissions, (t2, t1, k), 1.0);
                add(&mut counts.class_emissions, (t1, k), 1.0);
                add(&mut counts.tags_for_emission, t1, 1.0);
                add(&mut counts.tag_pairs_for_emission, (t2, t1), 1.0);
                add(&mut counts.classes, k, 1.0);
            } else {
                stats.emission_mismatches += 1;
                log::warn!(
                    "tag {} of '{}' is not in its ambiguity class {}",
                    td.tag_name(t1).unwrap_or("?"),
                    word.surface,
                    td.class_names(&tags)
                );
            }
        }
    }
    if let Some(word) = untagged.next_word()? {
        return Err(Error::StreamMisalignment { tagged: "<end of corpus>".to_string(), untagged: word.surface });
    }
    counts.corpus_length = stats.words;
    log::info!("{} tagged words, {} ambiguous, {} unknown", stats.words, stats.ambiguous_gold_tags, stats.unknown_words);
    Ok((counts, stats))
}
