//! Structured validation errors and their message rendering.

use std::fmt;

use crate::model::ServiceKind;

/// What rule a descriptor broke.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaErrorKind {
    /// The descriptor is not a mapping.
    NotAnObject,
    /// The descriptor mapping is empty.
    NoService,
    /// The descriptor's key is not a supported service.
    UnsupportedProxy {
        /// The offending key.
        tag: String,
    },
    /// The descriptor names several services.
    MultipleServices {
        /// All keys found.
        tags: Vec<String>,
    },
    /// A required field is absent.
    MissingField,
    /// A field has the wrong type or shape.
    TypeMismatch {
        /// Human description of the expected shape.
        expected: &'static str,
    },
    /// A field value is outside its enumeration.
    InvalidValue {
        /// The rejected value.
        value: String,
        /// Accepted values.
        allowed: Vec<&'static str>,
    },
    /// Two fields that exclude each other are both present.
    MutuallyExclusive {
        /// Full paths of the conflicting fields.
        fields: [String; 2],
    },
    /// None of a set of alternative fields is present.
    MissingOneOf {
        /// Accepted alternatives.
        fields: Vec<&'static str>,
    },
    /// A field outside the closed shape is present.
    UnknownField,
    /// A field must hold a specific value because another field is set.
    Conditional {
        /// The only accepted value.
        expected: &'static str,
        /// The field that forces it.
        because: &'static str,
    },
    /// An earlier descriptor already binds the same path and method.
    DuplicateRoute {
        /// Index of the earlier descriptor.
        first: usize,
        /// Normalized path.
        path: String,
        /// Upper-case verb.
        method: &'static str,
    },
    /// An `OPTIONS` method on a path that also gets a CORS preflight.
    PreflightConflict {
        /// Index of the first descriptor enabling CORS on the path.
        cors_index: usize,
        /// Normalized path.
        path: String,
    },
}

/// A single schema violation inside one descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// Position of the descriptor in the configured list.
    pub index: usize,
    /// Service the descriptor names, when recognized.
    pub service: Option<ServiceKind>,
    /// Dotted field path inside the service body (empty for the descriptor itself).
    pub path: String,
    /// Violated rule.
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub(crate) fn new(
        index: usize,
        service: Option<ServiceKind>,
        path: impl Into<String>,
        kind: SchemaErrorKind,
    ) -> Self {
        Self {
            index,
            service,
            path: path.into(),
            kind,
        }
    }
}

fn quoted_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| format!("\"{}\"", item.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.service {
            Some(service) => write!(f, "service proxy #{} (\"{service}\"): ", self.index)?,
            None => write!(f, "service proxy #{}: ", self.index)?,
        }

        let path = &self.path;
        match &self.kind {
            SchemaErrorKind::NotAnObject => {
                write!(f, "must be a mapping with exactly one service key")
            }
            SchemaErrorKind::NoService => write!(
                f,
                "must name one of the supported proxies: {}",
                ServiceKind::supported_tags()
            ),
            SchemaErrorKind::UnsupportedProxy { tag } => write!(
                f,
                "unsupported proxy \"{tag}\"; supported proxies are: {}",
                ServiceKind::supported_tags()
            ),
            SchemaErrorKind::MultipleServices { tags } => write!(
                f,
                "names {} services ({}); exactly one is allowed",
                tags.len(),
                quoted_list(tags)
            ),
            SchemaErrorKind::MissingField => write!(f, "\"{path}\" is required"),
            SchemaErrorKind::TypeMismatch { expected } => {
                write!(f, "\"{path}\" must be {expected}")
            }
            SchemaErrorKind::InvalidValue { value, allowed } => write!(
                f,
                "\"{path}\" must be one of [{}], got \"{value}\"",
                quoted_list(allowed)
            ),
            SchemaErrorKind::MutuallyExclusive { fields } => write!(
                f,
                "\"{}\" and \"{}\" cannot be used together",
                fields[0], fields[1]
            ),
            SchemaErrorKind::MissingOneOf { fields } => {
                write!(f, "\"{path}\" must contain one of {}", quoted_list(fields))
            }
            SchemaErrorKind::UnknownField => write!(f, "\"{path}\" is not allowed"),
            SchemaErrorKind::Conditional { expected, because } => write!(
                f,
                "\"{path}\" must be \"{expected}\" when \"{because}\" is set"
            ),
            SchemaErrorKind::DuplicateRoute {
                first,
                path: route,
                method,
            } => write!(
                f,
                "{method} /{route} is already bound by service proxy #{first}"
            ),
            SchemaErrorKind::PreflightConflict { cors_index, path: route }
                if *cors_index == self.index =>
            {
                write!(
                    f,
                    "\"cors\" cannot be enabled on OPTIONS /{route}; \
                     the CORS preflight uses that method"
                )
            }
            SchemaErrorKind::PreflightConflict { cors_index, path: route } => write!(
                f,
                "OPTIONS /{route} conflicts with the CORS preflight enabled by \
                 service proxy #{cors_index}"
            ),
        }
    }
}

impl std::error::Error for SchemaError {}

/// All schema violations found in a descriptor list.
///
/// Callers see the first violation through [`Display`](fmt::Display); the
/// full list is available via [`errors`](Self::errors).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.first())]
pub struct ValidationError {
    errors: Vec<SchemaError>,
}

impl ValidationError {
    /// Wrap a non-empty list of violations.
    pub(crate) fn new(errors: Vec<SchemaError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { errors }
    }

    /// The violation surfaced to callers.
    #[must_use]
    pub fn first(&self) -> &SchemaError {
        &self.errors[0]
    }

    /// Every violation, in descriptor order.
    #[must_use]
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_proxy_lists_supported_tags() {
        let err = SchemaError::new(
            0,
            None,
            "",
            SchemaErrorKind::UnsupportedProxy {
                tag: "lambda".to_string(),
            },
        );
        assert_eq!(
            err.to_string(),
            "service proxy #0: unsupported proxy \"lambda\"; \
             supported proxies are: kinesis, sqs, s3, sns, dynamodb, eventbridge"
        );
    }

    #[test]
    fn mutually_exclusive_names_both_fields() {
        let err = SchemaError::new(
            2,
            Some(ServiceKind::S3),
            "cors",
            SchemaErrorKind::MutuallyExclusive {
                fields: ["cors.origin".to_string(), "cors.origins".to_string()],
            },
        );
        assert_eq!(
            err.to_string(),
            "service proxy #2 (\"s3\"): \"cors.origin\" and \"cors.origins\" cannot be used together"
        );
    }

    #[test]
    fn validation_error_displays_first_error() {
        let first = SchemaError::new(
            0,
            Some(ServiceKind::Kinesis),
            "streamName",
            SchemaErrorKind::MissingField,
        );
        let second = SchemaError::new(
            1,
            Some(ServiceKind::Sqs),
            "queueName",
            SchemaErrorKind::MissingField,
        );
        let err = ValidationError::new(vec![first.clone(), second]);

        assert_eq!(err.to_string(), first.to_string());
        assert_eq!(err.errors().len(), 2);
    }

    #[test]
    fn duplicate_route_names_both_descriptors() {
        let err = SchemaError::new(
            3,
            Some(ServiceKind::Sns),
            "method",
            SchemaErrorKind::DuplicateRoute {
                first: 1,
                path: "q".to_string(),
                method: "POST",
            },
        );
        assert_eq!(
            err.to_string(),
            "service proxy #3 (\"sns\"): POST /q is already bound by service proxy #1"
        );
    }

    #[test]
    fn preflight_conflict_messages() {
        let own = SchemaError::new(
            0,
            Some(ServiceKind::Sqs),
            "cors",
            SchemaErrorKind::PreflightConflict {
                cors_index: 0,
                path: "q".to_string(),
            },
        );
        assert_eq!(
            own.to_string(),
            "service proxy #0 (\"sqs\"): \"cors\" cannot be enabled on OPTIONS /q; \
             the CORS preflight uses that method"
        );

        let other = SchemaError::new(
            2,
            Some(ServiceKind::Sqs),
            "method",
            SchemaErrorKind::PreflightConflict {
                cors_index: 1,
                path: "q".to_string(),
            },
        );
        assert_eq!(
            other.to_string(),
            "service proxy #2 (\"sqs\"): OPTIONS /q conflicts with the CORS preflight \
             enabled by service proxy #1"
        );
    }

    /// Compile-time assertion that `ValidationError` is `Send + Sync`.
    const _: () = {
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ValidationError>();
    };
}
