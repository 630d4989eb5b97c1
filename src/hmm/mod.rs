pub mod collection;
mod context;
pub mod data;
pub mod dict;
pub mod hmm2;
pub mod init;
pub mod io;
pub mod model;
pub mod rules;
pub mod smooth;
pub mod spec;
pub mod tagger;
pub mod trainer;
