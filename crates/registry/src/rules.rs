//! Pattern rules that synthesize descriptors for unknown keys

use crate::descriptor::{Descriptor, Strategy, Target};
use regex::Regex;
use rigger_core::{Error, Result};

/// A stored auto-registration rule
#[derive(Debug, Clone)]
pub struct AutoRule {
    pub key: String,
    pub pattern: Regex,
    /// Lifetime, args, dependencies and module location copied into synthesized descriptors
    pub template: Descriptor,
}

impl AutoRule {
    pub fn new(key: impl Into<String>, template: Descriptor) -> Result<Self> {
        let key = key.into();
        let source = template
            .pattern
            .as_deref()
            .ok_or_else(|| Error::configuration(format!("auto rule '{key}' has no pattern")))?;
        let pattern = Regex::new(source).map_err(|e| {
            Error::configuration(format!("auto rule '{key}' has an invalid pattern: {e}"))
        })?;
        Ok(Self {
            key,
            pattern,
            template,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.pattern.is_match(key)
    }

    /// Class descriptor for `key`, exporting `key` from the template's location
    pub fn synthesize(&self, key: &str) -> Descriptor {
        let mut location = self.template.location.clone();
        location.file = None;
        Descriptor {
            key: Some(key.to_string()),
            target: Some(Target::Export(key.to_string())),
            strategy: Strategy::Class,
            lifetime: self.template.lifetime,
            args: self.template.args.clone(),
            dependencies: self.template.dependencies.clone(),
            location,
            pattern: None,
        }
    }
}

/// Ordered rule list; the first matching rule that resolves wins
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: Vec<AutoRule>,
}

impl RuleTable {
    /// Append a rule; returns false when a rule with that key already exists
    pub fn push(&mut self, rule: AutoRule) -> bool {
        if self.rules.iter().any(|existing| existing.key == rule.key) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.key != key);
        before != self.rules.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rules.iter().any(|rule| rule.key == key)
    }

    /// Matching rules in registration order
    pub fn matching(&self, key: &str) -> Vec<AutoRule> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(key))
            .cloned()
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
