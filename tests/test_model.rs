use hmm_tagger::{Error, Hmm2, TaggerConfig, TaggerData, TaggerSpec, TextWordStream};

const SPEC: &str = r#"{
    "tags": [
        {"name": "DET", "closed": true},
        {"name": "NOUN"},
        {"name": "VERB"},
        {"name": "SENT", "closed": true}
    ],
    "forbid": [["DET", "SENT"], ["DET", "DET", "VERB"]],
    "enforce": [{"label": "DET", "after": ["NOUN", "VERB", "SENT"], "then": ["NOUN"]}],
    "prefer": ["NOUN"],
    "constants": {"kMOT": 1, "kDOLLAR": 300}
}"#;

const DICTIONARY: &str = "the\tthe/DET\nwalk\twalk/NOUN\twalk/VERB\ndogs\tdog/NOUN\n.\t./SENT\n";
const CORPUS: &str = "the\tthe/DET\nwalk\twalk/NOUN\twalk/VERB\n.\t./SENT\ndogs\tdog/NOUN\nwalk\twalk/NOUN\twalk/VERB\n.\t./SENT\n";

fn model() -> TaggerData {
    let td = TaggerSpec::from_reader(SPEC.as_bytes()).unwrap().build().unwrap();
    let mut hmm = Hmm2::new(td, TaggerConfig::default()).unwrap();
    let dictionary = TextWordStream::new(DICTIONARY.as_bytes(), hmm.data());
    hmm.read_dictionary(dictionary).unwrap();
    let corpus = TextWordStream::new(CORPUS.as_bytes(), hmm.data());
    hmm.init_probabilities_kupiec(corpus).unwrap();
    hmm.apply_rules();
    hmm.into_data()
}

fn to_bytes(td: &TaggerData) -> Vec<u8> {
    let mut buf = Vec::new();
    td.write(&mut buf).unwrap();
    buf
}

#[test]
fn test_write_and_read_model() {
    let mut td = model();
    td.set_patterns(vec![0xde, 0xad, 0xbe, 0xef]);
    let buf = to_bytes(&td);
    let read = TaggerData::from_memory(&buf).unwrap();
    assert_eq!(read, td);
    assert_eq!(read.constants()["kDOLLAR"], 300);
    assert_eq!(read.patterns(), &[0xde, 0xad, 0xbe, 0xef]);
    assert!(read.discard().is_empty());
    // writing again is byte-identical
    assert_eq!(to_bytes(&read), buf);
}

#[test]
fn test_discard_list_is_optional() {
    let mut td = model();
    let legacy = to_bytes(&td);
    td.set_discard(vec!["<ej>".to_string(), "<€>".to_string()]);
    let buf = to_bytes(&td);
    assert!(buf.len() > legacy.len());
    assert!(buf.starts_with(&legacy));

    let read = TaggerData::from_memory(&buf).unwrap();
    assert_eq!(read.discard(), &["<ej>".to_string(), "<€>".to_string()]);
    let read = TaggerData::from_memory(&legacy).unwrap();
    assert!(read.discard().is_empty());
}

#[test]
fn test_model_file_on_disk() {
    let td = model();
    let path = std::env::temp_dir().join(format!("hmm-tagger-{}.prob", std::process::id()));
    td.to_path(&path).unwrap();
    let read = TaggerData::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(read, td);
}

#[test]
fn test_truncated_model_is_corrupt() {
    let buf = to_bytes(&model());
    for len in [1, buf.len() / 3, buf.len() / 2, buf.len() - 9] {
        match TaggerData::from_memory(&buf[..len]) {
            Err(Error::CorruptModel(..)) => {}
            _ => panic!("prefix of {len} bytes was accepted"),
        }
    }
}

#[test]
fn test_open_empty_model_does_not_panic() {
    match TaggerData::from_memory(b"") {
        Err(Error::CorruptModel(..)) => {}
        _ => panic!("test fail"),
    }
}

#[test]
fn test_missing_model_file() {
    match TaggerData::from_path("tests/does-not-exist.prob") {
        Err(Error::Io(..)) => {}
        _ => panic!("test fail"),
    }
}

#[test]
fn test_emissions_stay_in_their_classes() {
    let td = model();
    assert!(!td.b_entries().is_empty());
    for ((_, i, k), p) in td.b_entries() {
        assert!(p > 0.0);
        assert!(td.output().class_by_id(k).unwrap().contains(&i));
    }
}

#[test]
fn test_dump_model() {
    let td = model();
    let mut out = Vec::new();
    td.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("AMBIGUITY CLASSES\n0: DET\n1: NOUN VERB\n"));
    assert!(text.contains("A[SENT][SENT][DET] = "));
    assert!(!text.contains("A[DET][SENT]"));
}
