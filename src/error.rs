use crate::entity::Kind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("malformed composite key {key}: {reason}")]
    KeyFormat { key: String, reason: String },
    #[error("cannot decode stored {kind} value: {reason}")]
    Decode { kind: Kind, reason: String },
    #[error("cannot encode {kind} value: {reason}")]
    Encode { kind: Kind, reason: String },
    #[error("{kind} with the key {key} doesn't exist")]
    NotFound { kind: Kind, key: String },
    #[error("{kind} with the key {key} already exists")]
    AlreadyExists { kind: Kind, key: String },
    #[error("{kind} cannot move from state {from} to state {to}")]
    IllegalTransition { kind: Kind, from: u8, to: u8 },
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("read conflict on key {key}, a concurrent invocation committed first")]
    Conflict { key: String },
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
}

/// Flat classification of [`Error`], reported to the invoking client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    KeyFormat,
    Decode,
    Encode,
    NotFound,
    AlreadyExists,
    IllegalTransition,
    Authorization,
    Conflict,
    Storage,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::KeyFormat { .. } => ErrorKind::KeyFormat,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Encode { .. } => ErrorKind::Encode,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            Error::Authorization(_) => ErrorKind::Authorization,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl ErrorKind {
    /// Response status reported for this kind of failure.
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::Validation
            | ErrorKind::KeyFormat
            | ErrorKind::AlreadyExists
            | ErrorKind::IllegalTransition => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Decode | ErrorKind::Encode | ErrorKind::Storage => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_error_names_the_kind() {
        let err = Error::IllegalTransition {
            kind: Kind::Invoice,
            from: 1,
            to: 4,
        };

        assert_eq!(err.kind(), ErrorKind::IllegalTransition);
        assert_eq!(
            err.to_string(),
            "Invoice cannot move from state 1 to state 4"
        );
    }

    #[test]
    fn status_codes_follow_kind() {
        assert_eq!(ErrorKind::Authorization.status(), 403);
        assert_eq!(ErrorKind::NotFound.status(), 404);
        assert_eq!(ErrorKind::Conflict.status(), 409);
        assert_eq!(Error::validation("bad").kind().status(), 400);
    }
}
