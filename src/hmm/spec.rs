use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{
    data::{AmbiguityClass, EnforceRule, ForbidRule, Tag},
    model::TaggerData,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDef {
    pub name: String,
    /// Closed tags never belong to the open class.
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforceDef {
    pub label: String,
    pub after: Vec<String>,
    #[serde(default)]
    pub then: Vec<String>,
}

/// Tag inventory and linguistic rules of a tagger, as JSON.
///
/// ```json
/// {
///   "tags": [{"name": "DET", "closed": true}, {"name": "NOUN"}, {"name": "SENT", "closed": true}],
///   "forbid": [["DET", "SENT"], ["DET", "DET", "DET"]],
///   "enforce": [{"label": "DET", "after": ["NOUN", "ADJ"]}]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerSpec {
    pub tags: Vec<TagDef>,
    pub forbid: Vec<Vec<String>>,
    pub enforce: Vec<EnforceDef>,
    pub prefer: Vec<String>,
    pub discard: Vec<String>,
    pub constants: BTreeMap<String, u32>,
}

impl TaggerSpec {
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self> {
        Ok(serde_json::from_reader(rdr)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// A model with the tag inventory, open class and rules filled in and no
    /// probabilities yet.
    pub fn build(&self) -> Result<TaggerData> {
        let mut td = TaggerData::new();
        let mut open_class = AmbiguityClass::new();
        for def in &self.tags {
            if td.tag_id(&def.name).is_some() {
                return Err(Error::InvalidConfig(format!("tag '{}' defined twice", def.name)));
            }
            let tag = td.add_tag(&def.name);
            if !def.closed {
                open_class.insert(tag);
            }
        }
        let tag = |name: &str| -> Result<Tag> { td.tag_id(name).ok_or_else(|| Error::UnknownTag(name.to_string())) };

        let mut forbid_rules = Vec::with_capacity(self.forbid.len());
        for labels in &self.forbid {
            let rule = match labels.as_slice() {
                [i, j] => ForbidRule::pair(tag(i)?, tag(j)?),
                [i, j, k] => ForbidRule::triple(tag(i)?, tag(j)?, tag(k)?),
                _ => {
                    return Err(Error::InvalidConfig(format!(
                        "forbid rule {labels:?} must have two or three labels"
                    )))
                }
            };
            forbid_rules.push(rule);
        }

        let mut enforce_rules = Vec::with_capacity(self.enforce.len());
        for def in &self.enforce {
            enforce_rules.push(EnforceRule {
                tagi: tag(&def.label)?,
                tagsj: def.after.iter().map(|s| tag(s)).collect::<Result<_>>()?,
                tagsk: def.then.iter().map(|s| tag(s)).collect::<Result<_>>()?,
            });
        }

        td.set_open_class(open_class);
        td.set_forbid_rules(forbid_rules);
        td.set_enforce_rules(enforce_rules);
        td.set_prefer_rules(self.prefer.clone());
        td.set_discard(self.discard.clone());
        td.set_constants(self.constants.clone());
        Ok(td)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"{
        "tags": [{"name": "DET", "closed": true}, {"name": "NOUN"}, {"name": "VERB"}, {"name": "SENT", "closed": true}],
        "forbid": [["DET", "SENT"], ["DET", "DET", "VERB"]],
        "enforce": [{"label": "DET", "after": ["NOUN"]}],
        "prefer": ["NOUN"]
    }"#;

    #[test]
    fn build_tagger_data() {
        let spec = TaggerSpec::from_reader(SPEC.as_bytes()).unwrap();
        let td = spec.build().unwrap();
        assert_eq!(td.num_tags(), 4);
        assert_eq!(td.open_class(), &AmbiguityClass::from([1, 2]));
        assert_eq!(td.forbid_rules(), &[ForbidRule::pair(0, 3), ForbidRule::triple(0, 0, 2)]);
        assert_eq!(td.enforce_rules()[0].tagsj, vec![1]);
        assert!(td.enforce_rules()[0].tagsk.is_empty());
        assert_eq!(td.prefer_rules(), &["NOUN".to_string()]);
    }

    #[test]
    fn unknown_label_in_rule() {
        let spec = TaggerSpec {
            tags: vec![TagDef { name: "DET".to_string(), closed: false }],
            forbid: vec![vec!["DET".to_string(), "ADV".to_string()]],
            ..Default::default()
        };
        assert!(matches!(spec.build(), Err(Error::UnknownTag(t)) if t == "ADV"));
    }

    #[test]
    fn malformed_forbid_rule() {
        let spec = TaggerSpec {
            tags: vec![TagDef { name: "DET".to_string(), closed: false }],
            forbid: vec![vec!["DET".to_string()]],
            ..Default::default()
        };
        assert!(matches!(spec.build(), Err(Error::InvalidConfig(_))));
    }
}
