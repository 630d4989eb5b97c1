use std::{
    collections::{HashMap, VecDeque},
    io::BufRead,
};

use bitflags::bitflags;

use crate::{
    error::{Error, Result},
    hmm::{
        data::{AmbiguityClass, Tag},
        model::TaggerData,
    },
};

bitflags! {
    /// Options for rendering tagged words.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OutputFlags: u8 {
        /// Prefix each line with the surface form.
        const SHOW_SUPERFICIAL = 0x01;
        /// Print every analysis, the chosen one first.
        const ALL_GOOD_FIRST = 0x02;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub lemma: String,
    pub tag: Tag,
}

/// A surface form and its candidate analyses; no analyses means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggerWord {
    pub surface: String,
    pub analyses: Vec<Analysis>,
}

impl TaggerWord {
    pub fn new(surface: &str) -> Self {
        Self { surface: surface.to_string(), analyses: Vec::new() }
    }

    pub fn with_analysis(mut self, lemma: &str, tag: Tag) -> Self {
        self.analyses.push(Analysis { lemma: lemma.to_string(), tag });
        self
    }

    /// The ambiguity class of the word; empty for unknown words.
    pub fn tags(&self) -> AmbiguityClass {
        self.analyses.iter().map(|a| a.tag).collect()
    }

    pub fn is_unknown(&self) -> bool {
        self.analyses.is_empty()
    }

    fn render(&self, analysis: &Analysis, td: &TaggerData) -> String {
        format!("{}/{}", analysis.lemma, td.tag_name(analysis.tag).unwrap_or("?"))
    }

    /// Renders the word disambiguated to `tag`.
    pub fn lexical_form(&self, tag: Tag, td: &TaggerData, flags: OutputFlags) -> String {
        let mut fields = Vec::new();
        if flags.contains(OutputFlags::SHOW_SUPERFICIAL) {
            fields.push(self.surface.clone());
        }
        match self.analyses.iter().position(|a| a.tag == tag) {
            None => fields.push(format!("*{}", self.surface)),
            Some(chosen) => {
                fields.push(self.render(&self.analyses[chosen], td));
                if flags.contains(OutputFlags::ALL_GOOD_FIRST) {
                    for (idx, analysis) in self.analyses.iter().enumerate() {
                        if idx != chosen {
                            fields.push(self.render(analysis, td));
                        }
                    }
                }
            }
        }
        fields.join("\t")
    }
}

/// A source of analysed words consumed strictly in order.
pub trait WordSource {
    /// `Ok(None)` marks the end of the stream.
    fn next_word(&mut self) -> Result<Option<TaggerWord>>;
}

impl<S: WordSource + ?Sized> WordSource for &mut S {
    fn next_word(&mut self) -> Result<Option<TaggerWord>> {
        (**self).next_word()
    }
}

/// Reads one word per line: `surface<TAB>lemma/TAG<TAB>...`.
///
/// A line holding only a surface form is an unknown word. Blank lines are
/// skipped.
pub struct TextWordStream<R> {
    rdr: R,
    tags: HashMap<String, Tag>,
    line: usize,
    buf: String,
}

impl<R: BufRead> TextWordStream<R> {
    pub fn new(rdr: R, td: &TaggerData) -> Self {
        let tags = td.tag_names().enumerate().map(|(id, name)| (name.to_string(), id)).collect();
        Self { rdr, tags, line: 0, buf: String::new() }
    }

    fn parse(&self, line: &str) -> Result<TaggerWord> {
        let mut fields = line.split('\t');
        let surface = fields.next().unwrap_or_default();
        let mut word = TaggerWord::new(surface);
        for field in fields.filter(|f| !f.is_empty()) {
            let (lemma, tag) = field.rsplit_once('/').ok_or_else(|| Error::InvalidInput {
                line: self.line,
                msg: format!("analysis '{field}' is not of the form lemma/TAG"),
            })?;
            let tag = self.tags.get(tag).copied().ok_or_else(|| Error::UnknownTag(tag.to_string()))?;
            word = word.with_analysis(lemma, tag);
        }
        Ok(word)
    }
}

impl<R: BufRead> WordSource for TextWordStream<R> {
    fn next_word(&mut self) -> Result<Option<TaggerWord>> {
        loop {
            self.buf.clear();
            if self.rdr.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            return self.parse(line).map(Some);
        }
    }
}

/// In-memory word source.
#[derive(Debug, Clone, Default)]
pub struct WordBuffer(VecDeque<TaggerWord>);

impl From<Vec<TaggerWord>> for WordBuffer {
    fn from(words: Vec<TaggerWord>) -> Self {
        Self(words.into())
    }
}

impl WordSource for WordBuffer {
    fn next_word(&mut self) -> Result<Option<TaggerWord>> {
        Ok(self.0.pop_front())
    }
}
