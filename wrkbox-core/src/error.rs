use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed number '{token}': {reason}")]
    MalformedNumber { token: String, reason: String },
    #[error("Parse error: {0}")]
    OutputParse(String),
}

impl Error {
    pub(crate) fn malformed(token: &str, reason: impl Into<String>) -> Self {
        Error::MalformedNumber {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
