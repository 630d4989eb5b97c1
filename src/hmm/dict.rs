use crate::{
    error::Result,
    stream::{TaggerWord, WordSource},
};

use super::{data::AmbiguityClass, model::TaggerData};

/// Registers every ambiguity class seen in `dictionary`, then the open class
/// and one singleton class per tag, and sizes the tensors to match.
///
/// Returns the number of words read.
pub fn read_dictionary<S: WordSource>(td: &mut TaggerData, mut dictionary: S) -> Result<usize> {
    let mut nw = 0;
    while let Some(word) = dictionary.next_word()? {
        nw += 1;
        let tags = word.tags();
        if !tags.is_empty() {
            td.output_mut().class_id_of(&tags);
        }
    }

    let open_class = td.open_class().clone();
    td.output_mut().class_id_of(&open_class);
    for t in 0..td.num_tags() {
        td.output_mut().class_id_of(&AmbiguityClass::from([t]));
    }

    let (n, m) = (td.num_tags(), td.output().len());
    td.allocate(n, m);
    log::info!("{nw} words in dictionary, {n} states and {m} ambiguity classes");
    Ok(nw)
}

/// Keeps the first word of every distinct, non-empty ambiguity class.
pub fn filter_ambiguity_classes<S: WordSource>(mut source: S) -> Result<Vec<TaggerWord>> {
    let mut seen = std::collections::HashSet::new();
    let mut words = Vec::new();
    while let Some(word) = source.next_word()? {
        let tags = word.tags();
        if !tags.is_empty() && seen.insert(tags) {
            words.push(word);
        }
    }
    Ok(words)
}
