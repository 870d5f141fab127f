//! Loader registry: ordered rules mapping file patterns to transform chains.
//!
//! Rules are evaluated in registration order and the first matching rule's
//! chain applies; there is no fallback transform, so a file matched by no
//! rule is passed through unchanged as JavaScript.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::config::{ConfigError, RuleConfig};
use crate::transform::{builtin_transform, Transform};

/// A single loader rule: a pattern and the transform chain it selects.
pub struct LoaderRule {
    /// Pattern tested against the module path (query selector excluded)
    pub pattern: Regex,
    /// Ordered transform chain
    pub chain: Vec<Arc<dyn Transform>>,
    /// Options handed to every stage of the chain
    pub options: HashMap<String, String>,
}

/// Ordered collection of loader rules.
#[derive(Default)]
pub struct LoaderRegistry {
    rules: Vec<LoaderRule>,
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field(
                "rules",
                &self.rules.iter().map(|r| r.pattern.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl LoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build a registry from configured rules.
    ///
    /// Fails validation when a pattern does not compile, a chain is empty,
    /// or a transform name is not a built-in.
    pub fn from_config(rules: &[RuleConfig]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        let mut errors = Vec::new();

        for rule in rules {
            let pattern = match Regex::new(&rule.test) {
                Ok(p) => p,
                Err(e) => {
                    errors.push(format!("invalid rule pattern '{}': {}", rule.test, e));
                    continue;
                }
            };

            if rule.transforms.is_empty() {
                errors.push(format!("rule '{}' has an empty transform chain", rule.test));
                continue;
            }

            let mut chain = Vec::new();
            for name in &rule.transforms {
                match builtin_transform(name) {
                    Some(t) => chain.push(t),
                    None => errors.push(format!(
                        "rule '{}' references unknown transform '{}'",
                        rule.test, name
                    )),
                }
            }

            if chain.len() == rule.transforms.len() {
                registry.rules.push(LoaderRule { pattern, chain, options: rule.options.clone() });
            }
        }

        if errors.is_empty() {
            Ok(registry)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Register a rule programmatically. Rules apply in registration order.
    pub fn with_rule(
        mut self,
        pattern: Regex,
        chain: Vec<Arc<dyn Transform>>,
        options: HashMap<String, String>,
    ) -> Self {
        self.rules.push(LoaderRule { pattern, chain, options });
        self
    }

    /// Find the rule for a path: first match wins, `None` when no rule matches.
    pub fn resolve_chain(&self, path: &Path) -> Option<&LoaderRule> {
        let path_str = path.to_string_lossy();
        self.rules.iter().find(|rule| rule.pattern.is_match(&path_str))
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
