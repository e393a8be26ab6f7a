use derive_more::{Display, Error};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The failure categories of one-time build and bake operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    #[display("file not found")]
    FileNotFound,
    #[display("invalid format")]
    InvalidFormat,
    #[display("unsupported format")]
    UnsupportedFormat,
    #[display("not enough memory")]
    NotEnoughMemory,
    #[display("atlas too large")]
    AtlasTooLarge,
    #[display("load failed")]
    LoadFailed,
}

/// A failed atlas build, font bake, or pixel buffer operation.
///
/// Each call returns its own error value, there is no shared "last error" state.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileNotFound, message)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidFormat, message)
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedFormat, message)
    }

    pub fn not_enough_memory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotEnoughMemory, message)
    }

    pub fn atlas_too_large(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AtlasTooLarge, message)
    }

    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LoadFailed, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_kind_and_message() {
        let error = Error::atlas_too_large("3 sources do not fit into 2048x2048");
        assert_eq!(error.kind(), ErrorKind::AtlasTooLarge);
        assert_eq!(
            error.to_string(),
            "atlas too large: 3 sources do not fit into 2048x2048"
        );
    }

    #[test]
    fn converts_into_anyhow() {
        let error: anyhow::Error = Error::file_not_found("sprites.png").into();
        let kind = error.downcast_ref::<Error>().map(Error::kind);
        assert_eq!(kind, Some(ErrorKind::FileNotFound));
    }
}
