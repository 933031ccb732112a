use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;

use super::extract::property::EncumbranceRecord;

/// A single extracted value. Dates stay as the text the document printed;
/// the assembler parses them when it needs arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Lines(Vec<String>),
    Encumbrances(Vec<EncumbranceRecord>),
}

/// Field name → value for one document. Missing anchors leave the key out.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn insert(&mut self, key: &str, value: FieldValue) {
        self.0.insert(key.to_string(), value);
    }

    pub fn insert_text(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.insert(key, FieldValue::Text(value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(FieldValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.0.get(key) {
            Some(FieldValue::Number(n)) => Some(*n),
            Some(FieldValue::Integer(n)) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn lines(&self, key: &str) -> &[String] {
        match self.0.get(key) {
            Some(FieldValue::Lines(lines)) => lines,
            _ => &[],
        }
    }

    pub fn encumbrances(&self, key: &str) -> &[EncumbranceRecord] {
        match self.0.get(key) {
            Some(FieldValue::Encumbrances(records)) => records,
            _ => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cleanup applied to every captured group of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Post {
    Trim,
    /// Collapse internal whitespace runs (including newlines) to one space.
    CollapseWhitespace,
    /// Trim each line and join the non-blank ones with a space.
    JoinLines,
}

impl Post {
    fn apply(self, raw: &str) -> String {
        match self {
            Post::Trim => raw.trim().to_string(),
            Post::CollapseWhitespace => raw.split_whitespace().collect::<Vec<_>>().join(" "),
            Post::JoinLines => raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// One row of a document's field table: capture group `i + 1` of the first
/// matching pattern feeds `fields[i]`.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub fields: &'static [&'static str],
    pub patterns: &'static [&'static str],
    pub post: Post,
}

impl FieldRule {
    pub const fn new(field: &'static [&'static str], patterns: &'static [&'static str]) -> Self {
        FieldRule {
            fields: field,
            patterns,
            post: Post::Trim,
        }
    }

    pub const fn with_post(mut self, post: Post) -> Self {
        self.post = post;
        self
    }
}

/// A field table with its patterns compiled once.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<(FieldRule, Vec<Regex>)>,
}

impl RuleSet {
    pub fn compile(rules: &[FieldRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                let compiled = rule
                    .patterns
                    .iter()
                    .map(|p| Regex::new(p))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*rule, compiled))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(RuleSet { rules })
    }

    /// Run every rule over `text`. Never fails: a rule without a match simply
    /// contributes nothing.
    pub fn apply(&self, text: &str) -> FieldMap {
        let mut map = FieldMap::default();
        for (rule, patterns) in &self.rules {
            let Some(caps) = patterns.iter().find_map(|re| re.captures(text)) else {
                continue;
            };
            for (i, field) in rule.fields.iter().enumerate() {
                if let Some(m) = caps.get(i + 1) {
                    map.insert_text(field, rule.post.apply(m.as_str()));
                }
            }
        }
        map
    }
}

// ── Tests ──
