use crate::{
    config::Symbols,
    error::{Error, Result},
    stream::{TaggerWord, WordSource},
};

use super::{
    context::ViterbiContext,
    data::{AmbiguityClass, ClassId, Float, Tag},
    model::TaggerData,
};

/// A word and the tag chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedWord {
    pub word: TaggerWord,
    pub tag: Tag,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagStats {
    pub words: usize,
    pub unknown_words: usize,
    /// Words whose ambiguity class was never seen in training.
    pub unseen_classes: usize,
    /// Anchors reached with a zero path probability.
    pub zero_probability_paths: usize,
    /// Words left pending when the stream ended.
    pub unresolved_words: usize,
    pub log_likelihood: Float,
}

/// Registered class that unknown words take: the open class itself, else
/// its largest registered subset, else the singleton of one open tag.
fn open_class_id(td: &TaggerData) -> Option<ClassId> {
    let output = td.output();
    let open = td.open_class();
    let k = output.id(open);
    if k.is_some() {
        return k;
    }
    let k = output
        .find_similar(open)
        .or_else(|| open.iter().find_map(|&t| output.id(&AmbiguityClass::from([t]))))?;
    log::warn!(
        "open class ({}) is not registered, unknown words take ({})",
        td.class_names(open),
        output.class_by_id(k).map(|c| td.class_names(c)).unwrap_or_default()
    );
    Some(k)
}

/// Online trigram Viterbi decoder.
///
/// Words are buffered until the current word and the previous one are both
/// unambiguous; the best path between the last two such anchors is then
/// emitted and the decoder restarts from the new anchor.
pub struct Hmm2Tagger<'a> {
    td: &'a TaggerData,
    debug: bool,
    open_class: ClassId,
    ctx: ViterbiContext,
    pending: Vec<TaggerWord>,
    tags: AmbiguityClass,
    pretags: AmbiguityClass,
    stats: TagStats,
}

impl<'a> Hmm2Tagger<'a> {
    pub fn new(td: &'a TaggerData, symbols: Symbols, debug: bool) -> Result<Self> {
        let open_class = open_class_id(td).ok_or_else(|| Error::UnknownAmbiguityClass {
            surface: String::new(),
            tags: td.class_names(td.open_class()),
        })?;
        let mut ctx = ViterbiContext::new(td.n());
        ctx.set_alpha(0, symbols.eos, symbols.eos, 1.0);
        Ok(Self {
            td,
            debug,
            open_class,
            ctx,
            pending: Vec::new(),
            tags: AmbiguityClass::from([symbols.eos]),
            pretags: AmbiguityClass::from([symbols.eos]),
            stats: TagStats::default(),
        })
    }

    pub fn stats(&self) -> &TagStats {
        &self.stats
    }

    fn resolve_class(&mut self, word: &TaggerWord) -> (AmbiguityClass, ClassId) {
        let td = self.td;
        let output = td.output();
        let tags = word.tags();
        if tags.is_empty() {
            self.stats.unknown_words += 1;
            let k = self.open_class;
            return (output.class_by_id(k).cloned().unwrap_or_default(), k);
        }
        if let Some(k) = output.id(&tags) {
            return (tags, k);
        }
        self.stats.unseen_classes += 1;
        let k = output.find_similar(&tags).unwrap_or(self.open_class);
        if self.debug {
            log::warn!(
                "ambiguity class of '{}' ({}) was not seen in training, using ({})",
                word.surface,
                td.class_names(&tags),
                output.class_by_id(k).map(|c| td.class_names(c)).unwrap_or_default()
            );
        }
        (output.class_by_id(k).cloned().unwrap_or_default(), k)
    }

    /// Feeds one word; returns the words disambiguated by it, in input order.
    pub fn push(&mut self, word: TaggerWord) -> Vec<TaggedWord> {
        let td = self.td;
        self.stats.words += 1;
        let (tags, k) = self.resolve_class(&word);
        self.pending.push(word);
        let nwpend = self.pending.len();

        let pretags = std::mem::replace(&mut self.tags, tags);
        let prepretags = std::mem::replace(&mut self.pretags, pretags);
        let cur = nwpend % 2;
        let prev = 1 - cur;
        self.ctx.reset(cur);
        for &i in &self.tags {
            for &j in &self.pretags {
                for &k2 in &prepretags {
                    let x = self.ctx.alpha(prev, k2, j) * td.a(k2, j, i) * td.b(j, i, k);
                    if self.ctx.alpha(cur, j, i) <= x {
                        self.ctx.set_alpha(cur, j, i, x);
                        self.ctx.set_best(cur, k2, j, i, nwpend > 1);
                    }
                }
            }
        }

        if self.tags.len() != 1 || self.pretags.len() != 1 {
            return Vec::new();
        }
        let tag = *self.tags.iter().next().unwrap_or(&0);
        let pretag = *self.pretags.iter().next().unwrap_or(&0);
        let prob = self.ctx.alpha(cur, pretag, tag);
        if prob > 0.0 {
            self.stats.log_likelihood -= prob.ln();
        } else {
            self.stats.zero_probability_paths += 1;
            if self.debug {
                log::warn!(
                    "zero probability path ending at word {} ('{}'), a likely source of tagging errors",
                    self.stats.words,
                    self.pending.last().map(|w| w.surface.as_str()).unwrap_or_default()
                );
            }
        }
        let path = self.ctx.best(cur, pretag, tag).to_vec();
        if path.len() != self.pending.len() {
            log::warn!("best path covers {} of {} pending words", path.len(), self.pending.len());
        }
        let tagged = self.pending.drain(..).zip(path).map(|(word, tag)| TaggedWord { word, tag }).collect();
        self.ctx.reset(0);
        self.ctx.set_alpha(0, pretag, tag, 1.0);
        tagged
    }

    /// Tags a whole stream, handing each disambiguated word to `sink`.
    pub fn tag_stream<S, F>(&mut self, mut source: S, mut sink: F) -> Result<()>
    where
        S: WordSource,
        F: FnMut(TaggedWord) -> Result<()>,
    {
        while let Some(word) = source.next_word()? {
            for tagged in self.push(word) {
                sink(tagged)?;
            }
        }
        Ok(())
    }

    /// Ends the stream. Words of a run that never reached an anchor are
    /// dropped and counted.
    pub fn finish(mut self) -> TagStats {
        if !self.pending.is_empty() {
            self.stats.unresolved_words = self.pending.len();
            log::warn!("{} words at the end of the text were left unresolved", self.pending.len());
        }
        self.stats
    }
}
