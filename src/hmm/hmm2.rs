use std::io::Write;

use crate::{
    config::{Symbols, TaggerConfig},
    error::{Error, Result},
    evaluation::Evaluation,
    stream::{OutputFlags, WordSource},
};

use super::{
    dict::read_dictionary,
    init::{kupiec_counts, tagged_counts, InitStats},
    model::TaggerData,
    rules::apply_rules,
    smooth::{calculate_smoothed_parameters, EventCounts},
    tagger::{Hmm2Tagger, TagStats, TaggedWord},
    trainer::{self, TrainStats},
};

/// Second order HMM tagger: a model plus the settings it runs with.
///
/// Training goes dictionary pass, initialization, rules, then any number of
/// [`Hmm2::train`] iterations; tagging only needs a trained model.
#[derive(Debug, Clone)]
pub struct Hmm2 {
    td: TaggerData,
    config: TaggerConfig,
    symbols: Symbols,
}

impl Hmm2 {
    pub fn new(td: TaggerData, config: TaggerConfig) -> Result<Self> {
        let symbols = config.resolve(&td)?;
        Ok(Self { td, config, symbols })
    }

    pub fn data(&self) -> &TaggerData {
        &self.td
    }

    pub fn into_data(self) -> TaggerData {
        self.td
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn symbols(&self) -> Symbols {
        self.symbols
    }

    pub fn read_dictionary<S: WordSource>(&mut self, dictionary: S) -> Result<usize> {
        read_dictionary(&mut self.td, dictionary)
    }

    /// Initializes `A` and `B` from class co-occurrences in `corpus`.
    pub fn init_probabilities_kupiec<S: WordSource>(&mut self, corpus: S) -> Result<(EventCounts, InitStats)> {
        let (counts, stats) = kupiec_counts(&self.td, self.symbols, self.config.corpus_length, corpus)?;
        calculate_smoothed_parameters(&mut self.td, &counts)?;
        Ok((counts, stats))
    }

    /// Initializes `A` and `B` from a hand-tagged corpus and its untagged
    /// analysis.
    pub fn init_probabilities_from_tagged_text<S: WordSource, U: WordSource>(
        &mut self,
        tagged: S,
        untagged: U,
    ) -> Result<(EventCounts, InitStats)> {
        let (counts, stats) = tagged_counts(&self.td, self.symbols, tagged, untagged)?;
        calculate_smoothed_parameters(&mut self.td, &counts)?;
        Ok((counts, stats))
    }

    /// Replaces `A` and `B` with estimates from previously saved counts.
    pub fn estimate(&mut self, counts: &EventCounts) -> Result<()> {
        calculate_smoothed_parameters(&mut self.td, counts)
    }

    pub fn apply_rules(&mut self) {
        apply_rules(&mut self.td);
    }

    /// One Baum-Welch iteration over `corpus`.
    pub fn train<S: WordSource>(&mut self, corpus: S) -> Result<(EventCounts, TrainStats)> {
        trainer::train(&mut self.td, self.symbols, self.config.corpus_length, corpus)
    }

    pub fn tagger(&self) -> Result<Hmm2Tagger<'_>> {
        Hmm2Tagger::new(&self.td, self.symbols, self.config.debug)
    }

    /// Tags `source`, writing one lexical form per line to `out`. Words
    /// tagged with the end-of-file tag produce no output.
    pub fn tag<S: WordSource, W: Write>(&self, source: S, mut out: W, flags: OutputFlags) -> Result<TagStats> {
        let mut tagger = self.tagger()?;
        let eof = self.symbols.eof;
        tagger.tag_stream(source, |TaggedWord { word, tag }| {
            if Some(tag) != eof {
                writeln!(out, "{}", word.lexical_form(tag, &self.td, flags))?;
            }
            Ok(())
        })?;
        out.flush()?;
        Ok(tagger.finish())
    }

    /// Tags `untagged` and scores the result against the aligned `gold`
    /// corpus, one sentence per end-of-sentence gold tag.
    pub fn evaluate<S: WordSource, G: WordSource>(&self, untagged: S, mut gold: G) -> Result<(Evaluation, TagStats)> {
        let mut tagger = self.tagger()?;
        let mut eval = Evaluation::default();
        let mut reference: Vec<&str> = Vec::new();
        let mut prediction: Vec<&str> = Vec::new();
        let name = |tag: Option<usize>| tag.and_then(|t| self.td.tag_name(t)).unwrap_or("*");

        tagger.tag_stream(untagged, |TaggedWord { word, tag }| {
            let expected = gold.next_word()?.ok_or_else(|| Error::StreamMisalignment {
                tagged: "<end of corpus>".to_string(),
                untagged: word.surface.clone(),
            })?;
            if expected.surface != word.surface {
                return Err(Error::StreamMisalignment { tagged: expected.surface, untagged: word.surface });
            }
            let gold_tag = expected.analyses.first().map(|a| a.tag);
            reference.push(name(gold_tag));
            prediction.push(name(Some(tag)));
            if gold_tag == Some(self.symbols.eos) {
                eval.accumulate(&reference, &prediction);
                reference.clear();
                prediction.clear();
            }
            Ok(())
        })?;
        if !reference.is_empty() {
            eval.accumulate(&reference, &prediction);
        }
        let stats = tagger.finish();
        eval.evaluate();
        Ok((eval, stats))
    }
}
