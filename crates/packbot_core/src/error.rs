use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AliasError {
    #[error("duplicate alias key: {0}")]
    DuplicateAlias(String),
}

/// Failures on the prediction path. Validation problems with the request are
/// kept apart from failures inside the model itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictError {
    #[error("Invalid date format. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("model error: {0}")]
    Model(String),
}

impl PredictError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidDate(_) | Self::MissingField(_))
    }
}
