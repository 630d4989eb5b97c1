use std::collections::HashMap;

use crate::{
    config::Symbols,
    error::{Error, Result},
    stream::{TaggerWord, WordSource},
};

use super::{
    data::{AmbiguityClass, ClassId, Float, Tag},
    model::TaggerData,
    smooth::{add, calculate_smoothed_parameters, EventCounts},
};

/// Summary of one expectation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainStats {
    pub words: usize,
    pub unknown_words: usize,
    /// Runs closed between two unambiguous anchors.
    pub runs: usize,
    /// Runs skipped because their path probability was zero.
    pub zero_probability_runs: usize,
    /// Negative log-likelihood of the closed runs.
    pub log_likelihood: Float,
}

/// Forward-backward accumulator over one pass of a corpus.
///
/// Only the words between two consecutive unambiguous anchors are expanded
/// into a lattice; when a word and its predecessor both have a single tag the
/// run is closed, its posterior counts are added, and a new run starts from
/// that pair.
pub struct BaumWelch<'a> {
    td: &'a TaggerData,
    eos: Tag,
    eof: Option<Tag>,
    open_class: AmbiguityClass,
    corpus_length: Option<usize>,
    /* classes of the words in the current run, two anchors first */
    pending: Vec<(AmbiguityClass, ClassId)>,
    /* alpha[t][(j, i)]: forward mass of tags j, i at positions t - 1, t */
    alpha: Vec<HashMap<(Tag, Tag), Float>>,
    counts: EventCounts,
    stats: TrainStats,
    last: (Tag, Tag),
}

fn anchor(tag: Tag, td: &TaggerData) -> Result<(AmbiguityClass, ClassId)> {
    let class = AmbiguityClass::from([tag]);
    let k = td.output().id(&class).ok_or_else(|| Error::UnknownAmbiguityClass {
        surface: String::new(),
        tags: td.class_names(&class),
    })?;
    Ok((class, k))
}

impl<'a> BaumWelch<'a> {
    pub fn new(td: &'a TaggerData, symbols: Symbols, corpus_length: Option<usize>) -> Result<Self> {
        let mut bw = Self {
            td,
            eos: symbols.eos,
            eof: symbols.eof,
            open_class: td.open_class().clone(),
            corpus_length,
            pending: Vec::new(),
            alpha: Vec::new(),
            counts: EventCounts::new(),
            stats: TrainStats::default(),
            last: (symbols.eos, symbols.eos),
        };
        bw.restart(symbols.eos, symbols.eos)?;
        Ok(bw)
    }

    fn restart(&mut self, pretag: Tag, tag: Tag) -> Result<()> {
        self.pending.clear();
        self.pending.push(anchor(pretag, self.td)?);
        self.pending.push(anchor(tag, self.td)?);
        self.alpha.clear();
        self.alpha.push(HashMap::new());
        self.alpha.push(HashMap::from([((pretag, tag), 1.0)]));
        Ok(())
    }

    /// Adds one word; returns `false` once the corpus length cutoff is met
    /// at a sentence end.
    pub fn push(&mut self, word: &TaggerWord) -> Result<bool> {
        let td = self.td;
        self.stats.words += 1;
        let mut tags = word.tags();
        if tags.is_empty() {
            tags = self.open_class.clone();
            self.stats.unknown_words += 1;
        }
        let k = td.output().id(&tags).ok_or_else(|| Error::UnknownAmbiguityClass {
            surface: word.surface.clone(),
            tags: td.class_names(&tags),
        })?;
        add(&mut self.counts.classes, k, 1.0);

        let len = self.pending.len();
        let mut alpha = HashMap::new();
        {
            let (pretags, _) = &self.pending[len - 1];
            let (prepretags, _) = &self.pending[len - 2];
            let prev = &self.alpha[len - 1];
            for &i in &tags {
                for &j in pretags {
                    let mut x = 0.0;
                    for &k2 in prepretags {
                        if let Some(&a) = prev.get(&(k2, j)) {
                            x += a * td.a(k2, j, i) * td.b(j, i, k);
                        }
                    }
                    if x > 0.0 {
                        alpha.insert((j, i), x);
                    }
                }
            }
        }
        let closes = tags.len() == 1 && self.pending[len - 1].0.len() == 1;
        self.alpha.push(alpha);
        self.pending.push((tags, k));

        if closes {
            let tag = *self.pending[len].0.iter().next().unwrap_or(&self.eos);
            let pretag = *self.pending[len - 1].0.iter().next().unwrap_or(&self.eos);
            self.close_run(pretag, tag);
            self.restart(pretag, tag)?;
            self.last = (pretag, tag);
            if let Some(limit) = self.corpus_length {
                if self.stats.words >= limit && tag == self.eos {
                    log::info!("corpus length cutoff reached after {} words", self.stats.words);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Backward pass over the run ending at the last pushed word.
    fn close_run(&mut self, pretag: Tag, tag: Tag) {
        let td = self.td;
        let len = self.pending.len() - 1;
        let prob = self.alpha[len].get(&(pretag, tag)).copied().unwrap_or(0.0);
        self.stats.runs += 1;
        if prob <= 0.0 {
            self.stats.zero_probability_runs += 1;
            log::debug!("zero probability run of {} words after word {}", len - 1, self.stats.words);
            return;
        }
        self.stats.log_likelihood -= prob.ln();

        let counts = &mut self.counts;
        let mut beta: HashMap<(Tag, Tag), Float> = HashMap::from([((pretag, tag), 1.0)]);
        for t in (2..=len).rev() {
            let (tags, k) = &self.pending[t];
            let (pretags, _) = &self.pending[t - 1];
            let (prepretags, _) = &self.pending[t - 2];
            let mut prev_beta = HashMap::new();
            for &i in tags {
                for &j in pretags {
                    let b = beta.get(&(j, i)).copied().unwrap_or(0.0);
                    if b == 0.0 {
                        continue;
                    }
                    let emission = td.b(j, i, *k);
                    for &k2 in prepretags {
                        let x = td.a(k2, j, i) * emission * b;
                        if x == 0.0 {
                            continue;
                        }
                        *prev_beta.entry((k2, j)).or_insert(0.0) += x;
                        if let Some(&a) = self.alpha[t - 1].get(&(k2, j)) {
                            add(&mut counts.tag_triples, (k2, j, i), a * x / prob);
                        }
                    }
                    let g = self.alpha[t].get(&(j, i)).copied().unwrap_or(0.0) * b / prob;
                    if g > 0.0 {
                        add(&mut counts.tag_pairs, (j, i), g);
                        add(&mut counts.tag_pairs_for_emission, (j, i), g);
                        add(&mut counts.tags, j, g);
                        add(&mut counts.tags_for_emission, i, g);
                        add(&mut counts.class_pair_emissions, (j, i, *k), g);
                        add(&mut counts.class_emissions, (i, *k), g);
                    }
                }
            }
            beta = prev_beta;
        }
    }

    /// Ends the pass, warning when the last run never closed.
    pub fn finish(self) -> (EventCounts, TrainStats) {
        let (pretag, tag) = self.last;
        let boundary = |t: Tag| t == self.eos || Some(t) == self.eof;
        if self.pending.len() > 2 || !(boundary(pretag) || boundary(tag)) {
            log::warn!(
                "the corpus does not end with the end-of-sentence tag; {} words left unresolved",
                self.pending.len() - 2
            );
        }
        let mut counts = self.counts;
        counts.corpus_length = self.stats.words;
        (counts, self.stats)
    }
}

/// Runs one expectation pass of `corpus` over the current model.
pub fn expectation<S: WordSource>(
    td: &TaggerData,
    symbols: Symbols,
    corpus_length: Option<usize>,
    mut corpus: S,
) -> Result<(EventCounts, TrainStats)> {
    let mut bw = BaumWelch::new(td, symbols, corpus_length)?;
    while let Some(word) = corpus.next_word()? {
        if !bw.push(&word)? {
            break;
        }
    }
    let (counts, stats) = bw.finish();
    log::info!(
        "{} words ({} unknown), {} runs, log-likelihood {}",
        stats.words,
        stats.unknown_words,
        stats.runs,
        stats.log_likelihood
    );
    Ok((counts, stats))
}

/// One Baum-Welch iteration: expectation over `corpus`, then re-estimation.
pub fn train<S: WordSource>(
    td: &mut TaggerData,
    symbols: Symbols,
    corpus_length: Option<usize>,
    corpus: S,
) -> Result<(EventCounts, TrainStats)> {
    let (counts, stats) = expectation(td, symbols, corpus_length, corpus)?;
    calculate_smoothed_parameters(td, &counts)?;
    Ok((counts, stats))
}
