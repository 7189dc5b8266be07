//! Rule catalog: the ordered table of required document types
//!
//! Loaded once from JSON and immutable afterwards. Declaration order in the
//! source document is preserved and is part of the classification contract:
//! the first satisfied rule wins.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::normalizer::normalize_for_matching;

/// Catalog shipped with the crate, used when no path is configured
pub const BUILTIN_RULES_JSON: &str = include_str!("../rules/document-rules.json");

/// How a rule decides it is satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Threshold {
    /// Total keyword hits across the text, repeats counted
    MinOccurrences(u32),
    /// Number of distinct keywords present at least once
    MinMatches(u32),
}

impl Threshold {
    pub fn value(&self) -> u32 {
        match self {
            Threshold::MinOccurrences(n) | Threshold::MinMatches(n) => *n,
        }
    }
}

/// A required document type and its match rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRule {
    pub key: String,
    pub label: String,
    /// Normalized with [`normalize_for_matching`], deduplicated, declaration order
    pub keywords: Vec<String>,
    /// `None` means the rule can never be satisfied
    pub threshold: Option<Threshold>,
}

impl DocumentRule {
    /// Build a rule, normalizing its keywords
    pub fn new<K, I, S>(
        key: K,
        label: impl Into<String>,
        keywords: I,
        threshold: Option<Threshold>,
    ) -> Result<Self, CatalogError>
    where
        K: Into<String>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = key.into();

        if let Some(t) = threshold {
            if t.value() == 0 {
                return Err(CatalogError::InvalidRule {
                    key,
                    reason: "threshold must be at least 1".to_string(),
                });
            }
        }

        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let kw = normalize_for_matching(keyword.as_ref());
            if kw.is_empty() {
                warn!(
                    "Rule '{}': keyword {:?} is empty after normalization, ignoring it",
                    key,
                    keyword.as_ref()
                );
                continue;
            }
            if !normalized.contains(&kw) {
                normalized.push(kw);
            }
        }

        if normalized.is_empty() {
            return Err(CatalogError::InvalidRule {
                key,
                reason: "rule has no usable keywords".to_string(),
            });
        }

        Ok(Self {
            key,
            label: label.into(),
            keywords: normalized,
            threshold,
        })
    }

    /// Total non-overlapping, left-to-right keyword hits, summed over keywords
    pub fn occurrence_count(&self, normalized_text: &str) -> usize {
        self.keywords
            .iter()
            .map(|kw| normalized_text.matches(kw.as_str()).count())
            .sum()
    }

    /// Number of keywords present at least once
    pub fn distinct_matches(&self, normalized_text: &str) -> usize {
        self.keywords
            .iter()
            .filter(|kw| normalized_text.contains(kw.as_str()))
            .count()
    }

    /// Evaluate the threshold predicate against strictly normalized text
    pub fn is_satisfied_by(&self, normalized_text: &str) -> bool {
        match self.threshold {
            Some(Threshold::MinOccurrences(n)) => {
                self.occurrence_count(normalized_text) >= n as usize
            }
            Some(Threshold::MinMatches(n)) => self.distinct_matches(normalized_text) >= n as usize,
            None => false,
        }
    }
}

/// One entry of the JSON catalog format
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleConfig {
    label: String,
    keywords: Vec<String>,
    #[serde(default)]
    min_matches: Option<u32>,
    #[serde(default)]
    min_occurrences: Option<u32>,
}

/// JSON object of rules, kept in document order
struct OrderedRules(Vec<(String, RuleConfig)>);

impl<'de> Deserialize<'de> for OrderedRules {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedRulesVisitor;

        impl<'de> Visitor<'de> for OrderedRulesVisitor {
            type Value = OrderedRules;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of rule key to rule definition")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, RuleConfig)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, rule)) = map.next_entry::<String, RuleConfig>()? {
                    if entries.iter().any(|(existing, _)| *existing == key) {
                        return Err(de::Error::custom(format!("duplicate rule key '{}'", key)));
                    }
                    entries.push((key, rule));
                }
                Ok(OrderedRules(entries))
            }
        }

        deserializer.deserialize_map(OrderedRulesVisitor)
    }
}

/// Ordered, immutable set of document rules
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleCatalog {
    rules: Vec<DocumentRule>,
}

impl RuleCatalog {
    /// Build a catalog from rules already in declaration order
    pub fn new(rules: Vec<DocumentRule>) -> Result<Self, CatalogError> {
        if rules.is_empty() {
            return Err(CatalogError::Empty);
        }
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.key == rule.key) {
                return Err(CatalogError::DuplicateKey(rule.key.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Parse the JSON catalog format
    ///
    /// A rule with neither `minMatches` nor `minOccurrences` is kept but can
    /// never match. When both are present `minOccurrences` wins.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let OrderedRules(entries) = serde_json::from_str(json)?;

        let mut rules = Vec::with_capacity(entries.len());
        for (key, config) in entries {
            let threshold = match (config.min_occurrences, config.min_matches) {
                (Some(occ), Some(_)) => {
                    warn!(
                        "Rule '{}' declares both minOccurrences and minMatches; using minOccurrences",
                        key
                    );
                    Some(Threshold::MinOccurrences(occ))
                }
                (Some(occ), None) => Some(Threshold::MinOccurrences(occ)),
                (None, Some(matches)) => Some(Threshold::MinMatches(matches)),
                (None, None) => {
                    warn!(
                        "Rule '{}' declares neither minMatches nor minOccurrences; it will never match",
                        key
                    );
                    None
                }
            };
            rules.push(DocumentRule::new(
                key,
                config.label,
                config.keywords,
                threshold,
            )?);
        }

        let catalog = Self::new(rules)?;
        debug!("Loaded rule catalog with {} rules", catalog.len());
        Ok(catalog)
    }

    /// Load a JSON catalog from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// The catalog compiled into the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_RULES_JSON)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentRule> {
        self.rules.iter()
    }

    pub fn rules(&self) -> &[DocumentRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Distinct labels in declaration order
    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }
        labels
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.rules.iter().any(|r| r.label == label)
    }
}
