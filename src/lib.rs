//! Trigram hidden Markov model part-of-speech tagger.
//!
//! Words arrive with their candidate tag sets (ambiguity classes). A model
//! is built from a dictionary pass, initialized either heuristically or from
//! a hand-tagged corpus, refined with Baum-Welch, constrained by forbid and
//! enforce rules, and finally used to pick one tag per word with an online
//! Viterbi decoder.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod hmm;
pub mod quark;
pub mod stream;

pub use config::{Symbols, TaggerConfig};
pub use error::{Error, Result};
pub use hmm::{
    collection::Collection,
    data::{AmbiguityClass, ClassId, EnforceRule, Float, ForbidRule, Tag},
    hmm2::Hmm2,
    model::TaggerData,
    smooth::EventCounts,
    spec::TaggerSpec,
    tagger::{Hmm2Tagger, TagStats, TaggedWord},
    trainer::TrainStats,
};
pub use stream::{OutputFlags, TaggerWord, TextWordStream, WordBuffer, WordSource};
