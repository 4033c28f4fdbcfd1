//! Process execution control.
//!
//! A [`RestrictionList`] is an ordered, append-only sequence of pattern
//! rules. Authorization walks it in registration order and the first match
//! governs; names that match nothing are authorized by default.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::levels::SafetyLevel;
use crate::types::Timestamp;

/// A named pattern rule gating process execution by risk tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRestriction {
    pub name: String,
    /// Case-insensitive, unanchored regular expression.
    pub pattern: String,
    pub risk_level: SafetyLevel,
    pub allowed_with_safeguards: bool,
    pub requires_authorization: bool,
}

impl ProcessRestriction {
    /// A hard-blocking restriction (not allowed with safeguards, requires
    /// authorization).
    pub fn new(name: impl Into<String>, pattern: impl Into<String>, risk_level: SafetyLevel) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            risk_level,
            allowed_with_safeguards: false,
            requires_authorization: true,
        }
    }

    pub fn allowed_with_safeguards(mut self, allowed: bool) -> Self {
        self.allowed_with_safeguards = allowed;
        self
    }

    pub fn requires_authorization(mut self, required: bool) -> Self {
        self.requires_authorization = required;
        self
    }
}

/// Thermally dangerous load generators blocked out of the box.
pub fn default_restrictions() -> Vec<ProcessRestriction> {
    vec![
        ProcessRestriction::new("cpu-burn", "cpu.*burn", SafetyLevel::Emergency),
        ProcessRestriction::new("stress-ng", "stress.*", SafetyLevel::Critical),
        ProcessRestriction::new("prime95", "prime.*", SafetyLevel::Critical),
        ProcessRestriction::new("folding@home", "fah.*", SafetyLevel::Warning)
            .allowed_with_safeguards(true),
    ]
}

/// Outcome of checking a process name against the restriction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// No restriction matched.
    Authorized,
    /// Matched a restriction that allows the process with safeguards and
    /// needs no explicit approval.
    AuthorizedWithSafeguards(ProcessRestriction),
    /// Matched a restriction that never allows the process.
    Blocked(ProcessRestriction),
    /// Matched a restriction that requires explicit approval. There is no
    /// approval path, so this is observably the same as [`Self::Blocked`].
    PendingAuthorization(ProcessRestriction),
}

impl AuthorizationDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized | Self::AuthorizedWithSafeguards(_))
    }

    /// The restriction that matched, if any. Every match counts as a violation.
    pub fn restriction(&self) -> Option<&ProcessRestriction> {
        match self {
            Self::Authorized => None,
            Self::AuthorizedWithSafeguards(r) | Self::Blocked(r) | Self::PendingAuthorization(r) => {
                Some(r)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRestriction {
    restriction: ProcessRestriction,
    regex: Regex,
}

/// Ordered restriction rules with their patterns compiled once at
/// registration.
#[derive(Debug, Clone, Default)]
pub struct RestrictionList {
    entries: Vec<CompiledRestriction>,
}

impl RestrictionList {
    /// An empty list: every process is authorized.
    pub fn new() -> Self {
        Self::default()
    }

    /// The list seeded with [`default_restrictions`].
    pub fn with_defaults() -> Self {
        let mut list = Self::new();
        for restriction in default_restrictions() {
            // Built-in patterns always compile.
            let _ = list.push(restriction);
        }
        list
    }

    /// Append a restriction. There is no removal API.
    pub fn push(&mut self, restriction: ProcessRestriction) -> Result<(), ConfigurationError> {
        let regex = RegexBuilder::new(&restriction.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigurationError::InvalidPattern {
                name: restriction.name.clone(),
                reason: e.to_string(),
            })?;
        self.entries.push(CompiledRestriction { restriction, regex });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessRestriction> {
        self.entries.iter().map(|e| &e.restriction)
    }

    /// First restriction, in registration order, whose pattern matches.
    pub fn first_match(&self, process_name: &str) -> Option<&ProcessRestriction> {
        self.entries
            .iter()
            .find(|e| e.regex.is_match(process_name))
            .map(|e| &e.restriction)
    }

    pub fn decide(&self, process_name: &str) -> AuthorizationDecision {
        let Some(restriction) = self.first_match(process_name) else {
            return AuthorizationDecision::Authorized;
        };

        if !restriction.allowed_with_safeguards {
            AuthorizationDecision::Blocked(restriction.clone())
        } else if restriction.requires_authorization {
            AuthorizationDecision::PendingAuthorization(restriction.clone())
        } else {
            AuthorizationDecision::AuthorizedWithSafeguards(restriction.clone())
        }
    }
}

/// Append-only violation log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub process: String,
    pub restriction_name: String,
    pub risk_level: SafetyLevel,
    pub timestamp: Timestamp,
}

impl ViolationRecord {
    pub fn new(process: impl Into<String>, restriction: &ProcessRestriction, at: Timestamp) -> Self {
        Self {
            process: process.into(),
            restriction_name: restriction.name.clone(),
            risk_level: restriction.risk_level,
            timestamp: at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
