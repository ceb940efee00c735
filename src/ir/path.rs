use std::fmt;
use std::sync::Arc;

use super::error::IrResult;
use super::identity::Id;
use super::node::{IrNode, NodeKind};
use super::source_info::SourceInfo;

/// A name reference, optionally qualified as absolute (`.foo`).
///
/// Display renders the name as written in the source; [`Path::as_string`]
/// renders the current internal name. Both carry the leading `.` when the
/// path is absolute.
#[derive(Debug, Clone)]
pub struct Path {
    pub src_info: SourceInfo,
    pub name: Id,
    pub absolute: bool,
}

impl Path {
    pub fn new(name: Id, absolute: bool) -> IrResult<Arc<Self>> {
        Path { src_info: name.src_info.clone(), name, absolute }.finish()
    }

    pub fn with_src(src_info: SourceInfo, name: Id, absolute: bool) -> IrResult<Arc<Self>> {
        let src_info = src_info.or_else(|| name.src_info.clone());
        Path { src_info, name, absolute }.finish()
    }

    /// Relative path to `name`.
    pub fn named(name: &str) -> IrResult<Arc<Self>> {
        Path::new(Id::new(name), false)
    }

    /// Internal form, reflecting any renaming.
    pub fn as_string(&self) -> String {
        if self.absolute {
            format!(".{}", self.name.name)
        } else {
            self.name.name.clone()
        }
    }

    pub fn is_dont_care(&self) -> bool {
        self.name.is_dont_care()
    }

    /// Same reference with a new internal name.
    pub fn renamed(&self, name: &str) -> IrResult<Arc<Self>> {
        let mut copy = self.clone();
        copy.name = self.name.renamed(name);
        copy.finish()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, ".{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl IrNode for Path {
    fn src_info(&self) -> &SourceInfo {
        &self.src_info
    }

    fn validate(&self) -> IrResult<()> {
        self.name.require_non_empty(NodeKind::Path)
    }

    fn dbprint_label(&self) -> String {
        self.as_string()
    }
}
