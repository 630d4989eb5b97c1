use hmm_tagger::{
    Error, Hmm2, Hmm2Tagger, OutputFlags, TaggerConfig, TaggerData, TaggerSpec, TaggerWord, TextWordStream, WordBuffer,
};

const SPEC: &str = r#"{
    "tags": [
        {"name": "DET", "closed": true},
        {"name": "NOUN"},
        {"name": "VERB"},
        {"name": "SENT", "closed": true}
    ]
}"#;

const DICTIONARY: &str = "\
the\tthe/DET
dog\tdog/NOUN
walks\twalk/VERB
walk\twalk/NOUN\twalk/VERB
.\t./SENT
";

const CORPUS: &str = "\
the\tthe/DET
dog\tdog/NOUN
walks\twalk/VERB
.\t./SENT
the\tthe/DET
walk\twalk/NOUN\twalk/VERB
.\t./SENT
the\tthe/DET
dog\tdog/NOUN
walk\twalk/NOUN\twalk/VERB
.\t./SENT
";

const DET: usize = 0;
const NOUN: usize = 1;
const VERB: usize = 2;
const SENT: usize = 3;

fn trained() -> Hmm2 {
    let td = TaggerSpec::from_reader(SPEC.as_bytes()).unwrap().build().unwrap();
    let mut hmm = Hmm2::new(td, TaggerConfig::default()).unwrap();
    let dictionary = TextWordStream::new(DICTIONARY.as_bytes(), hmm.data());
    hmm.read_dictionary(dictionary).unwrap();
    let corpus = TextWordStream::new(CORPUS.as_bytes(), hmm.data());
    hmm.init_probabilities_kupiec(corpus).unwrap();
    hmm.apply_rules();
    for _ in 0..2 {
        let corpus = TextWordStream::new(CORPUS.as_bytes(), hmm.data());
        hmm.train(corpus).unwrap();
        hmm.apply_rules();
    }
    hmm
}

fn tag_text(hmm: &Hmm2, text: &str, flags: OutputFlags) -> String {
    let mut out = Vec::new();
    hmm.tag(TextWordStream::new(text.as_bytes(), hmm.data()), &mut out, flags).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn unambiguous_words_are_emitted_immediately() {
    let hmm = trained();
    let mut tagger = hmm.tagger().unwrap();
    let words = [
        TaggerWord::new("the").with_analysis("the", DET),
        TaggerWord::new("dog").with_analysis("dog", NOUN),
        TaggerWord::new("walks").with_analysis("walk", VERB),
        TaggerWord::new(".").with_analysis(".", SENT),
    ];
    for (word, tag) in words.iter().zip([DET, NOUN, VERB, SENT]) {
        let tagged = tagger.push(word.clone());
        assert_eq!(tagged.len(), 1);
        assert_eq!(&tagged[0].word, word);
        assert_eq!(tagged[0].tag, tag);
    }
    let stats = tagger.finish();
    assert_eq!(stats.words, 4);
    assert_eq!(stats.unresolved_words, 0);
}

#[test]
fn ambiguous_run_is_released_at_the_next_anchor() {
    let hmm = trained();
    let mut tagger = hmm.tagger().unwrap();
    assert_eq!(tagger.push(TaggerWord::new("the").with_analysis("the", DET)).len(), 1);
    let walk = TaggerWord::new("walk").with_analysis("walk", NOUN).with_analysis("walk", VERB);
    assert!(tagger.push(walk).is_empty());
    // "." is unambiguous but follows an ambiguous word
    assert!(tagger.push(TaggerWord::new(".").with_analysis(".", SENT)).is_empty());
    let tagged = tagger.push(TaggerWord::new("the").with_analysis("the", DET));
    let surfaces: Vec<_> = tagged.iter().map(|t| t.word.surface.as_str()).collect();
    assert_eq!(surfaces, vec!["walk", ".", "the"]);
    assert!([NOUN, VERB].contains(&tagged[0].tag));
    assert_eq!(tagged[1].tag, SENT);
    assert_eq!(tagged[2].tag, DET);
}

#[test]
fn unknown_word_takes_an_open_class_tag() {
    let hmm = trained();
    let text = "the\tthe/DET\nflurb\n.\t./SENT\nthe\tthe/DET\ndog\tdog/NOUN\n.\t./SENT\n";
    let mut tagged = Vec::new();
    let mut tagger = hmm.tagger().unwrap();
    tagger
        .tag_stream(TextWordStream::new(text.as_bytes(), hmm.data()), |t| {
            tagged.push(t);
            Ok(())
        })
        .unwrap();
    let stats = tagger.finish();
    assert_eq!(tagged.len(), 6);
    assert_eq!(stats.unknown_words, 1);
    assert!(tagged[1].word.is_unknown());
    assert!([NOUN, VERB].contains(&tagged[1].tag));

    let out = tag_text(&hmm, text, OutputFlags::empty());
    assert_eq!(out.lines().nth(1), Some("*flurb"));
}

#[test]
fn unseen_class_falls_back_to_a_registered_subset() {
    let hmm = trained();
    let mut tagger = hmm.tagger().unwrap();
    tagger.push(TaggerWord::new("the").with_analysis("the", DET));
    // {DET, NOUN, VERB} is not registered; {NOUN, VERB} is its largest subset
    let odd = TaggerWord::new("that").with_analysis("that", DET).with_analysis("that", NOUN).with_analysis("that", VERB);
    assert!(tagger.push(odd).is_empty());
    let tagged = tagger.push(TaggerWord::new(".").with_analysis(".", SENT));
    assert!(tagged.is_empty());
    let tagged = tagger.push(TaggerWord::new("the").with_analysis("the", DET));
    assert_eq!(tagged.len(), 3);
    assert!([NOUN, VERB].contains(&tagged[0].tag));
    assert_eq!(tagger.stats().unseen_classes, 1);
}

#[test]
fn output_flags_change_the_rendering() {
    let hmm = trained();
    let text = "the\tthe/DET\nwalk\twalk/NOUN\twalk/VERB\n.\t./SENT\n";
    let plain = tag_text(&hmm, text, OutputFlags::empty());
    let lines: Vec<_> = plain.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "the/DET");
    assert!(lines[1] == "walk/NOUN" || lines[1] == "walk/VERB");
    assert_eq!(lines[2], "./SENT");

    let all = tag_text(&hmm, text, OutputFlags::SHOW_SUPERFICIAL | OutputFlags::ALL_GOOD_FIRST);
    let second = all.lines().nth(1).unwrap();
    assert!(second.starts_with("walk\twalk/"));
    assert_eq!(second.split('\t').count(), 3);
}

#[test]
fn evaluation_against_gold() {
    let hmm = trained();
    let untagged = "the\tthe/DET\ndog\tdog/NOUN\n.\t./SENT\nthe\tthe/DET\nwalk\twalk/NOUN\twalk/VERB\n.\t./SENT\nthe\tthe/DET\n";
    let gold = "the\tthe/DET\ndog\tdog/NOUN\n.\t./SENT\nthe\tthe/DET\nwalk\twalk/NOUN\n.\t./SENT\nthe\tthe/DET\n";
    let (mut eval, stats) = hmm
        .evaluate(
            TextWordStream::new(untagged.as_bytes(), hmm.data()),
            TextWordStream::new(gold.as_bytes(), hmm.data()),
        )
        .unwrap();
    assert_eq!(stats.words, 7);
    assert_eq!(stats.unresolved_words, 0);
    let est = eval.evaluate();
    assert!(est.accuracy >= 5.0 / 6.0);
    assert!(eval.to_string().contains("Word accuracy"));
}

#[test]
fn evaluation_requires_aligned_gold() {
    let hmm = trained();
    let untagged = "the\tthe/DET\ndog\tdog/NOUN\n";
    let gold = "the\tthe/DET\nwalk\twalk/NOUN\n";
    let ret = hmm.evaluate(
        TextWordStream::new(untagged.as_bytes(), hmm.data()),
        TextWordStream::new(gold.as_bytes(), hmm.data()),
    );
    match ret {
        Err(Error::StreamMisalignment { .. }) => {}
        _ => panic!("test fail"),
    }
}

/// DET NOUN VERB SENT with only the singleton classes registered, so the
/// open class {NOUN, VERB} has no class of its own.
fn singletons_only(uniform: bool) -> Hmm2 {
    let mut td = TaggerData::new();
    for name in ["DET", "NOUN", "VERB", "SENT"] {
        td.add_tag(name);
    }
    td.set_open_class([NOUN, VERB].into_iter().collect());
    for tag in [DET, NOUN, VERB, SENT] {
        td.output_mut().class_id_of(&[tag].into_iter().collect());
    }
    td.allocate(4, 4);
    if uniform {
        for i in 0..4 {
            for j in 0..4 {
                td.a_row_mut(i, j).fill(0.25);
                // class k is the singleton {k}
                td.set_b(i, j, j, 1.0);
            }
        }
    }
    Hmm2::new(td, TaggerConfig::default()).unwrap()
}

#[test]
fn unknown_word_decodes_under_an_unregistered_open_class() {
    let hmm = singletons_only(true);
    assert!(hmm.data().output().id(hmm.data().open_class()).is_none());

    let mut tagger = hmm.tagger().unwrap();
    assert_eq!(tagger.push(TaggerWord::new("the").with_analysis("the", DET)).len(), 1);
    let tagged = tagger.push(TaggerWord::new("flurb"));
    assert_eq!(tagged.len(), 1);
    assert!(tagged[0].word.is_unknown());
    assert_eq!(tagged[0].tag, NOUN);
    let stats = tagger.finish();
    assert_eq!(stats.unknown_words, 1);
    assert_eq!(stats.unseen_classes, 0);
    assert_eq!(stats.zero_probability_paths, 0);

    let out = tag_text(&hmm, "the\tthe/DET\nflurb\n.\t./SENT\n", OutputFlags::empty());
    assert_eq!(out.lines().collect::<Vec<_>>(), vec!["the/DET", "*flurb", "./SENT"]);
}

#[test]
fn zero_probability_path_still_emits_the_best_path() {
    let hmm = singletons_only(false);
    let mut tagger = hmm.tagger().unwrap();
    let the = TaggerWord::new("the").with_analysis("the", DET);
    let tagged = tagger.push(the.clone());
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].word, the);
    assert_eq!(tagged[0].tag, DET);
    let stats = tagger.finish();
    assert_eq!(stats.zero_probability_paths, 1);
    assert_eq!(stats.log_likelihood, 0.0);
}

#[test]
fn trailing_ambiguity_is_reported() {
    let hmm = trained();
    let mut tagger: Hmm2Tagger = hmm.tagger().unwrap();
    let words = WordBuffer::from(vec![
        TaggerWord::new("the").with_analysis("the", DET),
        TaggerWord::new("walk").with_analysis("walk", NOUN).with_analysis("walk", VERB),
    ]);
    let mut count = 0;
    tagger
        .tag_stream(words, |_| {
            count += 1;
            Ok(())
        })
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(tagger.finish().unresolved_words, 1);
}
