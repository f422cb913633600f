//! Performance signatures: API payloads, parent selection and subtest correlation
//!
//! Perfherder returns signatures as a JSON object keyed by signature hash:
//! ```text
//! { "9b3ac9...": { "id": 1659462, "framework_id": 10, "suite": "raptor-tp6", ... } }
//! ```
//! Option collections come back as a list mapping an option collection hash
//! to its build options (`opt`, `pgo`, ...).

use crate::data::SeriesConfig;
use crate::error::{Error, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the option collection mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionCollection {
    pub option_collection_hash: String,
    pub options: Vec<BuildOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildOption {
    pub name: String,
}

impl OptionCollection {
    /// Name of the first option; this is what a series config's `option` matches
    pub fn primary_option(&self) -> Option<&str> {
        self.options.first().map(|o| o.name.as_str())
    }
}

fn default_lower_is_better() -> bool {
    true
}

/// A signature as returned by the signatures endpoint (without its hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSignature {
    pub id: u64,
    pub framework_id: u32,
    pub option_collection_hash: String,
    pub machine_platform: String,
    pub suite: String,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default = "default_lower_is_better")]
    pub lower_is_better: bool,
    #[serde(default)]
    pub has_subtests: bool,
    #[serde(default)]
    pub extra_options: Vec<String>,
    #[serde(default)]
    pub parent_signature: Option<String>,
}

impl RawSignature {
    /// Attach the hash the payload was keyed by
    pub fn into_signature(self, hash: String) -> Signature {
        Signature {
            id: self.id,
            hash,
            suite: self.suite,
            test: self.test.filter(|t| !t.is_empty()),
            platform: self.machine_platform,
            framework: self.framework_id,
            option_collection_hash: self.option_collection_hash,
            parent_signature_hash: self.parent_signature,
            lower_is_better: self.lower_is_better,
            has_subtests: self.has_subtests,
            extra_options: self.extra_options,
        }
    }
}

/// Signatures payload keyed by hash, in response order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureMap {
    entries: Vec<(String, RawSignature)>,
}

impl SignatureMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(hash, _)| hash.as_str())
    }
}

impl IntoIterator for SignatureMap {
    type Item = (String, RawSignature);
    type IntoIter = std::vec::IntoIter<(String, RawSignature)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'de> Deserialize<'de> for SignatureMap {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = SignatureMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of signature hashes to signatures")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, RawSignature>()? {
                    entries.push(entry);
                }
                Ok(SignatureMap { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// A resolved performance signature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signature {
    pub id: u64,
    pub hash: String,
    pub suite: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    pub platform: String,
    pub framework: u32,
    pub option_collection_hash: String,
    /// Set for subtests only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_signature_hash: Option<String>,
    pub lower_is_better: bool,
    pub has_subtests: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_options: Vec<String>,
}

impl Signature {
    pub fn is_subtest(&self) -> bool {
        self.parent_signature_hash.is_some()
    }
}

/// Signatures keyed by hash, in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureSet {
    entries: Vec<Signature>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a signature, replacing any entry with the same hash in place.
    /// Returns the replaced signature.
    pub fn insert(&mut self, signature: Signature) -> Option<Signature> {
        match self.entries.iter_mut().find(|s| s.hash == signature.hash) {
            Some(existing) => Some(std::mem::replace(existing, signature)),
            None => {
                self.entries.push(signature);
                None
            }
        }
    }

    pub fn get(&self, hash: &str) -> Option<&Signature> {
        self.entries.iter().find(|s| s.hash == hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.get(hash).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signature> {
        self.entries.iter()
    }

    /// Signature ids, as used by the data endpoint
    pub fn ids(&self) -> Vec<u64> {
        self.entries.iter().map(|s| s.id).collect()
    }

    /// Keep only signatures measuring the given subtest
    pub fn retain_test(&mut self, test: &str) {
        self.entries.retain(|s| s.test.as_deref() == Some(test));
    }
}

impl FromIterator<Signature> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Signature>>(iter: I) -> Self {
        let mut set = SignatureSet::new();
        for signature in iter {
            set.insert(signature);
        }
        set
    }
}

impl<'a> IntoIterator for &'a SignatureSet {
    type Item = &'a Signature;
    type IntoIter = std::slice::Iter<'a, Signature>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Pick the single top-level signature matching `config`.
///
/// A candidate matches when its suite equals `config.suite` and its option
/// collection hash belongs to a collection whose primary option is
/// `config.option`. Anything other than exactly one match is an error.
pub fn select_parent<I>(
    config: &SeriesConfig,
    options: &[OptionCollection],
    signatures: I,
) -> Result<Signature>
where
    I: IntoIterator<Item = (String, RawSignature)>,
{
    let option_hashes: Vec<&str> = options
        .iter()
        .filter(|c| c.primary_option() == Some(config.option.as_str()))
        .map(|c| c.option_collection_hash.as_str())
        .collect();

    let mut matches: Vec<Signature> = signatures
        .into_iter()
        .filter(|(_, raw)| {
            raw.suite == config.suite
                && option_hashes.contains(&raw.option_collection_hash.as_str())
        })
        .map(|(hash, raw)| raw.into_signature(hash))
        .collect();

    match matches.len() {
        1 => Ok(matches.remove(0)),
        count => Err(Error::AmbiguousSignatureError {
            config: config.clone(),
            count,
        }),
    }
}

/// Merge the subtests of `parent` (and optionally the parent itself) into one set.
///
/// Subtests keep the order they are given in; the parent goes last. Every
/// subtest is linked to `parent` regardless of what the payload claims.
pub fn correlate<I>(parent: &Signature, children: I, include_parent: bool) -> SignatureSet
where
    I: IntoIterator<Item = (String, RawSignature)>,
{
    let mut set: SignatureSet = children
        .into_iter()
        .map(|(hash, raw)| {
            let mut signature = raw.into_signature(hash);
            signature.parent_signature_hash = Some(parent.hash.clone());
            signature
        })
        .collect();

    if include_parent {
        set.insert(parent.clone());
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn raw(id: u64, suite: &str, test: Option<&str>, option_hash: &str) -> RawSignature {
        RawSignature {
            id,
            framework_id: 1,
            option_collection_hash: option_hash.to_string(),
            machine_platform: "windows10-64".to_string(),
            suite: suite.to_string(),
            test: test.map(str::to_string),
            lower_is_better: true,
            has_subtests: test.is_none(),
            extra_options: Vec::new(),
            parent_signature: None,
        }
    }

    fn options() -> Vec<OptionCollection> {
        vec![
            OptionCollection {
                option_collection_hash: "opt-hash".to_string(),
                options: vec![BuildOption {
                    name: "opt".to_string(),
                }],
            },
            OptionCollection {
                option_collection_hash: "pgo-hash".to_string(),
                options: vec![BuildOption {
                    name: "pgo".to_string(),
                }],
            },
        ]
    }

    fn config() -> SeriesConfig {
        SeriesConfig {
            suite: "raptor-speedometer".to_string(),
            platform: "windows10-64".to_string(),
            framework: 1,
            option: "opt".to_string(),
            test: None,
        }
    }

    #[test]
    fn test_select_parent_single_match() {
        let mut signatures = BTreeMap::new();
        signatures.insert("a".to_string(), raw(1, "raptor-speedometer", None, "opt-hash"));
        signatures.insert("b".to_string(), raw(2, "raptor-speedometer", None, "pgo-hash"));
        signatures.insert("c".to_string(), raw(3, "raptor-tp6", None, "opt-hash"));

        let parent = select_parent(&config(), &options(), signatures).unwrap();
        assert_eq!(parent.hash, "a");
        assert_eq!(parent.id, 1);
        assert_eq!(parent.platform, "windows10-64");
        assert!(!parent.is_subtest());
    }

    #[test]
    fn test_select_parent_two_matches_is_ambiguous() {
        let mut signatures = BTreeMap::new();
        signatures.insert("a".to_string(), raw(1, "raptor-speedometer", None, "opt-hash"));
        signatures.insert("b".to_string(), raw(2, "raptor-speedometer", None, "opt-hash"));

        let err = select_parent(&config(), &options(), signatures).unwrap_err();
        match err {
            Error::AmbiguousSignatureError { config: c, count } => {
                assert_eq!(count, 2);
                assert_eq!(c, config());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_parent_no_match() {
        let mut signatures = BTreeMap::new();
        signatures.insert("b".to_string(), raw(2, "raptor-speedometer", None, "pgo-hash"));

        let err = select_parent(&config(), &options(), signatures).unwrap_err();
        assert!(matches!(
            err,
            Error::AmbiguousSignatureError { count: 0, .. }
        ));
    }

    #[test]
    fn test_correlate_includes_parent_last() {
        let parent = raw(1, "tp6", None, "opt-hash").into_signature("parent".to_string());
        let children = vec![
            ("s1".to_string(), raw(10, "tp6", Some("tp6-amazon"), "opt-hash")),
            ("s2".to_string(), raw(11, "tp6", Some("tp6-google"), "opt-hash")),
        ];

        let set = correlate(&parent, children, true);
        let hashes: Vec<&str> = set.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes, vec!["s1", "s2", "parent"]);
        assert_eq!(set.ids(), vec![10, 11, 1]);
        assert_eq!(
            set.get("s1").unwrap().parent_signature_hash.as_deref(),
            Some("parent")
        );
    }

    #[test]
    fn test_correlate_without_parent() {
        let parent = raw(1, "tp6", None, "opt-hash").into_signature("parent".to_string());
        let children = vec![("s1".to_string(), raw(10, "tp6", Some("tp6-amazon"), "opt-hash"))];

        let set = correlate(&parent, children, false);
        assert_eq!(set.len(), 1);
        assert!(!set.contains("parent"));
    }

    #[test]
    fn test_correlate_never_duplicates_hashes() {
        let parent = raw(1, "tp6", None, "opt-hash").into_signature("parent".to_string());
        let children = vec![
            ("s1".to_string(), raw(10, "tp6", Some("tp6-amazon"), "opt-hash")),
            ("s1".to_string(), raw(10, "tp6", Some("tp6-amazon"), "opt-hash")),
            ("parent".to_string(), raw(1, "tp6", None, "opt-hash")),
            ("s2".to_string(), raw(11, "tp6", Some("tp6-google"), "opt-hash")),
        ];

        let set = correlate(&parent, children, true);
        let mut hashes: Vec<&str> = set.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes, vec!["s1", "parent", "s2"]);

        hashes.sort();
        hashes.dedup();
        assert_eq!(hashes.len(), set.len());
        // The parent entry is the resolved parent, not the subtest-linked copy
        assert!(!set.get("parent").unwrap().is_subtest());
    }

    #[test]
    fn test_retain_test() {
        let parent = raw(1, "tp6", None, "opt-hash").into_signature("parent".to_string());
        let children = vec![
            ("s1".to_string(), raw(10, "tp6", Some("tp6-amazon"), "opt-hash")),
            ("s2".to_string(), raw(11, "tp6", Some("tp6-google"), "opt-hash")),
        ];

        let mut set = correlate(&parent, children, true);
        set.retain_test("tp6-google");
        assert_eq!(set.ids(), vec![11]);
    }

    #[test]
    fn test_raw_signature_from_api_payload() {
        let json = r#"{
            "9b3ac9": {
                "id": 1659462,
                "framework_id": 10,
                "signature_hash": "9b3ac9",
                "machine_platform": "android-hw-p2-8-0-arm7-api-16",
                "suite": "raptor-tp6m-amazon",
                "test": "",
                "lower_is_better": true,
                "has_subtests": true,
                "option_collection_hash": "102210fe594ee9b33d82058545b1ed14f4c8206e",
                "extra_options": ["geckoview"]
            }
        }"#;

        let parsed: SignatureMap = serde_json::from_str(json).unwrap();
        let (hash, raw) = parsed.into_iter().next().unwrap();
        let signature = raw.into_signature(hash);
        assert_eq!(signature.hash, "9b3ac9");
        assert_eq!(signature.framework, 10);
        assert_eq!(signature.test, None);
        assert_eq!(signature.extra_options, vec!["geckoview".to_string()]);
    }

    #[test]
    fn test_signature_map_keeps_response_order() {
        let json = r#"{
            "zzz": { "id": 3, "framework_id": 1, "option_collection_hash": "opt-hash",
                     "machine_platform": "linux64", "suite": "tp6", "test": "tp6-zzz" },
            "mmm": { "id": 2, "framework_id": 1, "option_collection_hash": "opt-hash",
                     "machine_platform": "linux64", "suite": "tp6", "test": "tp6-mmm" },
            "aaa": { "id": 1, "framework_id": 1, "option_collection_hash": "opt-hash",
                     "machine_platform": "linux64", "suite": "tp6", "test": "tp6-aaa" }
        }"#;

        let parsed: SignatureMap = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed.hashes().collect::<Vec<_>>(), vec!["zzz", "mmm", "aaa"]);

        let parent = raw(9, "tp6", None, "opt-hash").into_signature("parent".to_string());
        let set = correlate(&parent, parsed, true);
        let hashes: Vec<&str> = set.iter().map(|s| s.hash.as_str()).collect();
        assert_eq!(hashes, vec!["zzz", "mmm", "aaa", "parent"]);
    }

    #[test]
    fn test_signature_map_rejects_non_object() {
        assert!(serde_json::from_str::<SignatureMap>("[]").is_err());
    }
}
