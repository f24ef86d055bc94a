use std::fmt::{self, Display};

/// Errors produced by model constructors and string conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidValue { kind: &'static str, value: String },
    AmountOverflow,
}

impl ModelError {
    pub fn invalid(kind: &'static str, value: impl Into<String>) -> Self {
        ModelError::InvalidValue {
            kind,
            value: value.into(),
        }
    }
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidValue { kind, value } => {
                write!(f, "invalid {kind}: {value}")
            }
            ModelError::AmountOverflow => write!(f, "amount overflow"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
