use hmm_tagger::{Hmm2, TaggerConfig, TaggerData, TaggerWord};

pub const NUM_TAGS: usize = 12;
pub const SENT: usize = NUM_TAGS - 1;

/// Deterministic pseudo-random corpus over a fixed set of ambiguity classes.
pub fn corpus(words: usize) -> Vec<TaggerWord> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as usize
    };
    let mut corpus = Vec::with_capacity(words);
    for n in 0..words {
        if n % 15 == 14 {
            corpus.push(TaggerWord::new(".").with_analysis(".", SENT));
            continue;
        }
        let first = next() % (NUM_TAGS - 1);
        let mut word = TaggerWord::new(&format!("w{first}")).with_analysis("w", first);
        if next() % 3 == 0 {
            let second = (first + 1 + next() % 3) % (NUM_TAGS - 1);
            word = word.with_analysis("w", second);
        }
        corpus.push(word);
    }
    corpus
}

pub fn model(corpus: &[TaggerWord]) -> Hmm2 {
    let mut td = TaggerData::new();
    for t in 0..NUM_TAGS - 1 {
        td.add_tag(&format!("T{t}"));
    }
    td.add_tag("SENT");
    td.set_open_class((0..NUM_TAGS - 1).collect());
    let mut hmm = Hmm2::new(td, TaggerConfig::default()).expect("sentence tag is defined");
    hmm.read_dictionary(hmm_tagger::WordBuffer::from(corpus.to_vec())).expect("dictionary pass");
    hmm.init_probabilities_kupiec(hmm_tagger::WordBuffer::from(corpus.to_vec())).expect("initialization");
    hmm.apply_rules();
    hmm
}
