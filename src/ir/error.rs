use thiserror::Error;

use super::node::NodeKind;
use super::source_info::SourceInfo;

/// Internal invariant failure: the tree is malformed.
///
/// These are raised by constructors and copy-on-write setters and indicate a
/// bug in whichever pass produced the tree. Callers propagate them with `?`
/// and the pipeline aborts the run on the first one.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IrError {
    #[error("{kind}: empty name at {src_info}")]
    EmptyName { kind: NodeKind, src_info: SourceInfo },

    #[error("{parent}.{field}: expected {expected}, found {found}")]
    UnexpectedChild {
        parent: NodeKind,
        field: &'static str,
        expected: &'static str,
        found: NodeKind,
    },

    #[error("{kind} {name}: duplicate declaration at {src_info}, previously declared at {previous}")]
    DuplicateDeclaration {
        kind: NodeKind,
        name: String,
        src_info: SourceInfo,
        previous: SourceInfo,
    },

    #[error("transform replaced a {expected} with a {found}")]
    RewriteKindMismatch { expected: NodeKind, found: NodeKind },

    #[error("{kind}: {message}")]
    InvalidField { kind: NodeKind, message: String },

    #[error("json: {0}")]
    Json(String),

    #[error("pipeline: {0}")]
    Pipeline(String),
}

impl IrError {
    pub fn invalid(kind: NodeKind, message: impl Into<String>) -> Self {
        IrError::InvalidField { kind, message: message.into() }
    }

    /// Location the failure refers to, when it carries one.
    pub fn src_info(&self) -> SourceInfo {
        match self {
            IrError::EmptyName { src_info, .. } | IrError::DuplicateDeclaration { src_info, .. } => {
                src_info.clone()
            }
            _ => SourceInfo::invalid(),
        }
    }
}

impl From<serde_json::Error> for IrError {
    fn from(err: serde_json::Error) -> Self {
        IrError::Json(err.to_string())
    }
}

pub type IrResult<T> = Result<T, IrError>;
