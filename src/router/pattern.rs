//! Path templates such as `/api/zpool/{name}/` compiled to anchored regexes.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use regex::Regex;

use crate::core::errors::{Result, SimError};

/// Values captured from a matched path, by position and by template name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    positional: Vec<String>,
    named: BTreeMap<String, String>,
}

impl PathParams {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positional.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RoutePattern {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl RoutePattern {
    /// Compile a template. `{name}` matches one non-empty path segment; a
    /// trailing slash is optional on the matched path either way.
    pub fn compile(template: &str) -> Result<Self> {
        if !template.starts_with('/') {
            return Err(SimError::RouteConflict {
                details: format!("route template {template:?} must start with '/'"),
            });
        }
        let trimmed = template.trim_end_matches('/');
        let mut source = String::from("^");
        let mut names = Vec::new();
        for segment in trimmed.split('/').skip(1) {
            source.push('/');
            if let Some(name) = segment
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                if name.is_empty() || names.iter().any(|n| n == name) {
                    return Err(SimError::RouteConflict {
                        details: format!("route template {template:?} has a bad parameter {name:?}"),
                    });
                }
                source.push_str("([^/]+)");
                names.push(name.to_string());
            } else {
                source.push_str(&regex::escape(segment));
            }
        }
        source.push_str("/?$");
        let regex = Regex::new(&source).map_err(|e| SimError::RouteConflict {
            details: format!("route template {template:?}: {e}"),
        })?;
        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Template with parameter names erased and the trailing slash dropped,
    /// so `/a/{x}/` and `/a/{y}` compare equal.
    #[must_use]
    pub fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in self.template.trim_end_matches('/').split('/').skip(1) {
            shape.push('/');
            if segment.starts_with('{') {
                shape.push_str("{}");
            } else {
                shape.push_str(segment);
            }
        }
        shape
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        let positional: Vec<String> = caps
            .iter()
            .skip(1)
            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();
        let named = self
            .names
            .iter()
            .cloned()
            .zip(positional.iter().cloned())
            .collect();
        Some(PathParams { positional, named })
    }
}
