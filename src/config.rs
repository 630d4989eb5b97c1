use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    hmm::{data::Tag, model::TaggerData},
};

/// Settings shared by training and tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Tag closing a sentence.
    pub eos_tag: String,
    /// Tag marking the end of a file; optional in the tag inventory.
    pub eof_tag: String,
    /// Stop initialization and training at the first sentence end after this
    /// many words.
    pub corpus_length: Option<usize>,
    /// Report zero-probability paths and unseen ambiguity classes.
    pub debug: bool,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self { eos_tag: "SENT".to_string(), eof_tag: "kEOF".to_string(), corpus_length: None, debug: false }
    }
}

/// Sentinel tags resolved against a tag inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbols {
    pub eos: Tag,
    pub eof: Option<Tag>,
}

impl TaggerConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
    }

    pub fn resolve(&self, td: &TaggerData) -> Result<Symbols> {
        let eos = td
            .tag_id(&self.eos_tag)
            .ok_or_else(|| Error::InvalidConfig(format!("end-of-sentence tag '{}' is not in the tag set", self.eos_tag)))?;
        Ok(Symbols { eos, eof: td.tag_id(&self.eof_tag) })
    }
}
