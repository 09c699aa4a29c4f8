use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning user parameters into a remote request and
/// executing it.
#[derive(Debug, Error)]
pub enum MappingError {
    /// A raw value could not be converted to the shape a tag requires
    #[error("cannot coerce '{literal}': expected {expected}")]
    Coercion { literal: String, expected: String },

    /// A field path is syntactically invalid
    #[error("invalid field path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A destination field is missing or of the wrong kind
    #[error("cannot set '{path}' on {target}: {reason}")]
    Assignment {
        path: String,
        target: String,
        reason: String,
    },

    /// Any mapping error annotated with the user-facing parameter name
    #[error("parameter '{name}': {source}")]
    Parameter {
        name: String,
        #[source]
        source: Box<MappingError>,
    },

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    /// File, URL or inline content could not be loaded
    #[error("cannot load content from '{source_ref}': {message}")]
    Content { source_ref: String, message: String },

    /// The remote function returned an error
    #[error("{call}: {message}")]
    RemoteCall { call: String, message: String },

    /// The remote function panicked
    #[error("{call}: recovered from panic: {message}")]
    Panic { call: String, message: String },

    /// A value could not be read back out of a response
    #[error("cannot extract '{path}' from response: {message}")]
    Extraction { path: String, message: String },

    /// A checker exhausted its time budget
    #[error("check {check}: timeout of {timeout:?} expired")]
    Timeout { check: String, timeout: Duration },

    /// A checker fetch function failed
    #[error("check {check}: {message}")]
    Check { check: String, message: String },

    /// An image or resource lookup failed
    #[error("resolve: {0}")]
    Resolve(String),
}

impl MappingError {
    pub fn coercion(literal: impl ToString, expected: impl Into<String>) -> Self {
        MappingError::Coercion {
            literal: literal.to_string(),
            expected: expected.into(),
        }
    }

    pub fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        MappingError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn assignment(path: impl ToString, target: &str, reason: impl Into<String>) -> Self {
        MappingError::Assignment {
            path: path.to_string(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    /// Annotate this error with the parameter it was raised for
    pub fn for_parameter(self, name: &str) -> Self {
        MappingError::Parameter {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_annotation_keeps_inner_message() {
        let err = MappingError::coercion("abc", "an integer").for_parameter("count");

        assert_eq!(
            err.to_string(),
            "parameter 'count': cannot coerce 'abc': expected an integer"
        );
    }

    #[test]
    fn test_timeout_names_configured_duration() {
        let err = MappingError::Timeout {
            check: "instance running".to_string(),
            timeout: Duration::from_secs(180),
        };

        assert!(err.to_string().contains("180s"));
    }
}
