//! Parse options.

use serde::{Deserialize, Serialize};

use crate::error::Severity;

/// Error-severity diagnostics after which a compile unit is abandoned.
pub const DEFAULT_MAX_ERRORS: usize = 100;

/// Nested actions and expressions allowed before a compile unit is abandoned.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Whether a check runs, and how loudly it complains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckLevel {
    #[default]
    Ignore,
    Warning,
    Error,
}

impl CheckLevel {
    /// Severity of a diagnostic raised under this level.
    pub fn severity(self) -> Option<Severity> {
        match self {
            CheckLevel::Ignore => None,
            CheckLevel::Warning => Some(Severity::Warning),
            CheckLevel::Error => Some(Severity::Error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Variable, command, lookup and library action references must resolve.
    pub references: CheckLevel,
    /// Duplicate declarations in one context, and variables shadowing
    /// inherited ones.
    pub redeclarations: CheckLevel,
    pub max_errors: usize,
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            references: CheckLevel::Ignore,
            redeclarations: CheckLevel::Ignore,
            max_errors: DEFAULT_MAX_ERRORS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid parse options: {0}")]
    Json(#[from] serde_json::Error),
    #[error("max_errors must be at least 1")]
    ZeroMaxErrors,
    #[error("max_depth must be at least 1")]
    ZeroMaxDepth,
}

impl ParseOptions {
    /// Options with every check enabled at error severity.
    pub fn strict() -> Self {
        ParseOptions {
            references: CheckLevel::Error,
            redeclarations: CheckLevel::Error,
            ..ParseOptions::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let options: ParseOptions = serde_json::from_str(json)?;
        if options.max_errors == 0 {
            return Err(ConfigError::ZeroMaxErrors);
        }
        if options.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let opts = ParseOptions::from_json_str(r#"{ "references": "warning" }"#).unwrap();
        assert_eq!(opts.references, CheckLevel::Warning);
        assert_eq!(opts.redeclarations, CheckLevel::Ignore);
        assert_eq!(opts.max_errors, DEFAULT_MAX_ERRORS);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn unknown_fields_and_zero_limit_are_rejected() {
        assert!(matches!(
            ParseOptions::from_json_str(r#"{ "strictness": 3 }"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            ParseOptions::from_json_str(r#"{ "max_errors": 0 }"#),
            Err(ConfigError::ZeroMaxErrors)
        ));
        assert!(matches!(
            ParseOptions::from_json_str(r#"{ "max_depth": 0 }"#),
            Err(ConfigError::ZeroMaxDepth)
        ));
        let opts = ParseOptions::from_json_str(r#"{ "max_depth": 16 }"#).unwrap();
        assert_eq!(opts.max_depth, 16);
    }

    #[test]
    fn levels_map_to_severities() {
        assert_eq!(CheckLevel::Ignore.severity(), None);
        assert_eq!(CheckLevel::Error.severity(), Some(Severity::Error));
        assert_eq!(CheckLevel::default().severity(), None);
    }
}
