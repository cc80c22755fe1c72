use crate::version::VersionId;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Relation-layer failures additionally carry a [`RelationError`] detail so
/// callers can tell resolution, validation, snapshot and misuse apart.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError; store corruption gets a default detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        let message = message.into();

        let detail = match (class, origin) {
            (ErrorClass::Corruption, ErrorOrigin::Store) => {
                Some(ErrorDetail::Store(StoreError::Corrupt {
                    message: message.clone(),
                }))
            }
            _ => None,
        };

        Self {
            class,
            origin,
            message,
            detail,
        }
    }

    // Build a relation-detail error; the message always mirrors the detail.
    fn relation(class: ErrorClass, origin: ErrorOrigin, err: RelationError) -> Self {
        Self {
            class,
            origin,
            message: err.to_string(),
            detail: Some(ErrorDetail::Relation(err)),
        }
    }

    /// Construct a store-origin corruption error.
    pub(crate) fn store_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Store, message.into())
    }

    /// Construct a version-origin invariant violation.
    pub(crate) fn version_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Version,
            message.into(),
        )
    }

    /// Construct a serialize-origin internal error.
    pub(crate) fn serialize_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, message.into())
    }

    /// Construct a query-origin unsupported error.
    pub(crate) fn query_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Query, message.into())
    }

    pub fn store_not_found(key: impl Into<String>) -> Self {
        let key = key.into();

        Self {
            class: ErrorClass::NotFound,
            origin: ErrorOrigin::Store,
            message: format!("data key not found: {key}"),
            detail: Some(ErrorDetail::Store(StoreError::NotFound { key })),
        }
    }

    /// An indirect pointer that names no snapshot of the expected entity.
    pub(crate) fn resolution(field: &str, entity: &str, version: VersionId) -> Self {
        Self::relation(
            ErrorClass::Corruption,
            ErrorOrigin::Relation,
            RelationError::Resolution {
                field: field.to_string(),
                entity: entity.to_string(),
                version,
            },
        )
    }

    /// A submitted value that is not an available logical entity.
    pub(crate) fn validation(entity: &str, value: impl fmt::Display, reason: &str) -> Self {
        Self::relation(
            ErrorClass::Validation,
            ErrorOrigin::Form,
            RelationError::Validation {
                entity: entity.to_string(),
                value: value.to_string(),
                reason: reason.to_string(),
            },
        )
    }

    /// The version store could not produce a snapshot for a pending write.
    pub(crate) fn snapshot_creation(
        entity: &str,
        key: impl fmt::Display,
        reason: impl fmt::Display,
    ) -> Self {
        Self::relation(
            ErrorClass::Internal,
            ErrorOrigin::Version,
            RelationError::SnapshotCreation {
                entity: entity.to_string(),
                key: key.to_string(),
                reason: reason.to_string(),
            },
        )
    }

    /// Programmer error: unbound field, saving through a proxy, and so on.
    pub(crate) fn misuse(message: impl Into<String>) -> Self {
        Self::relation(
            ErrorClass::Misuse,
            ErrorOrigin::Relation,
            RelationError::Misuse {
                message: message.into(),
            },
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Store(StoreError::NotFound { .. }))
        )
    }

    /// Return the relation-layer detail, if this error carries one.
    #[must_use]
    pub const fn relation_error(&self) -> Option<&RelationError> {
        match &self.detail {
            Some(ErrorDetail::Relation(err)) => Some(err),
            _ => None,
        }
    }

    /// Return the relation-layer error kind, if this error carries one.
    #[must_use]
    pub const fn relation_kind(&self) -> Option<RelationErrorKind> {
        match self.relation_error() {
            Some(err) => Some(err.kind()),
            None => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Store(StoreError),
    #[error("{0}")]
    Relation(RelationError),
}

///
/// StoreError
///
/// Store-specific structured error detail.
/// Never returned directly; always wrapped in [`ErrorDetail::Store`].
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("key not found: {key}")]
    NotFound { key: String },

    #[error("store corruption: {message}")]
    Corrupt { message: String },
}

///
/// RelationError
///
/// Failure taxonomy of the indirect relation layer.
///

#[derive(Debug, ThisError)]
pub enum RelationError {
    #[error("indirect pointer {field} -> version {version} does not resolve to a snapshot of {entity}")]
    Resolution {
        field: String,
        entity: String,
        version: VersionId,
    },

    #[error("select a valid choice: {entity} '{value}' {reason}")]
    Validation {
        entity: String,
        value: String,
        reason: String,
    },

    #[error("snapshot creation failed for {entity} '{key}': {reason}")]
    SnapshotCreation {
        entity: String,
        key: String,
        reason: String,
    },

    #[error("relation misuse: {message}")]
    Misuse { message: String },
}

impl RelationError {
    #[must_use]
    pub const fn kind(&self) -> RelationErrorKind {
        match self {
            Self::Resolution { .. } => RelationErrorKind::Resolution,
            Self::Validation { .. } => RelationErrorKind::Validation,
            Self::SnapshotCreation { .. } => RelationErrorKind::SnapshotCreation,
            Self::Misuse { .. } => RelationErrorKind::Misuse,
        }
    }
}

///
/// RelationErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationErrorKind {
    Resolution,
    Validation,
    SnapshotCreation,
    Misuse,
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Internal,
    Unsupported,
    InvariantViolation,
    Validation,
    Misuse,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::Validation => "validation",
            Self::Misuse => "misuse",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Serialize,
    Store,
    Version,
    Relation,
    Form,
    Query,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Serialize => "serialize",
            Self::Store => "store",
            Self::Version => "version",
            Self::Relation => "relation",
            Self::Form => "form",
            Self::Query => "query",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
