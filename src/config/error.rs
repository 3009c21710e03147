//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An integer variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidInteger {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A floating point variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidFloat {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// A boolean variable was not one of the accepted spellings.
    #[error("invalid boolean {name}='{value}': expected true/false, 1/0, yes/no or on/off")]
    InvalidBool { name: &'static str, value: String },

    /// An enumerated variable had an unknown value.
    #[error("invalid {name}: {reason}")]
    InvalidChoice { name: &'static str, reason: String },

    /// A value parsed but violates an invariant.
    #[error("invalid {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}
