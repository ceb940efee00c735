//! Identifier tokens and declaration identity.
//!
//! Every declaration pairs an [`Id`] (the textual name, with its own source
//! location) with a [`DeclId`] drawn from an [`IdAllocator`]. The allocator
//! is owned by the compilation session and handed to every declaration
//! constructor, so two declarations sharing a name are still distinguishable.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::error::{IrError, IrResult};
use super::node::NodeKind;
use super::source_info::SourceInfo;

/// Name used for the placeholder identifier `_`.
pub const DONT_CARE: &str = "_";

/// An identifier token.
///
/// `name` is the current internal name (it may be rewritten by renaming
/// passes, e.g. `foo` → `foo$1`), `original_name` is the name as written in
/// the source and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id {
    pub src_info: SourceInfo,
    pub name: String,
    pub original_name: String,
}

impl Id {
    pub fn new(name: impl Into<String>) -> Self {
        Id::with_src(SourceInfo::invalid(), name)
    }

    pub fn with_src(src_info: SourceInfo, name: impl Into<String>) -> Self {
        let name = name.into();
        Id { src_info, original_name: name.clone(), name }
    }

    /// The `_` placeholder name.
    pub fn dont_care() -> Self {
        Id::new(DONT_CARE)
    }

    pub fn is_dont_care(&self) -> bool {
        self.name == DONT_CARE
    }

    /// Returns a copy carrying a new internal name; the original name and the
    /// location are kept.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Id { src_info: self.src_info.clone(), name: name.into(), original_name: self.original_name.clone() }
    }

    pub fn is_renamed(&self) -> bool {
        self.name != self.original_name
    }

    pub(crate) fn require_non_empty(&self, kind: NodeKind) -> IrResult<()> {
        if self.name.is_empty() {
            return Err(IrError::EmptyName { kind, src_info: self.src_info.clone() });
        }
        Ok(())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.original_name.is_empty() {
            f.write_str(&self.name)
        } else {
            f.write_str(&self.original_name)
        }
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Id::new(name)
    }
}

/// Session-unique declaration identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(u64);

impl DeclId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic source of [`DeclId`]s.
///
/// Ids are never reused and the counter is never reset; one allocator lives
/// as long as the compilation session that owns it.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: AtomicU64::new(0) }
    }

    pub fn fresh(&self) -> DeclId {
        DeclId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

/// Name and identity shared by both declaration hierarchies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclInfo {
    pub name: Id,
    pub decl_id: DeclId,
}

impl DeclInfo {
    /// Allocates a fresh identity for `name`, rejecting empty names.
    pub fn new(ids: &IdAllocator, name: Id, kind: NodeKind) -> IrResult<Self> {
        name.require_non_empty(kind)?;
        Ok(DeclInfo { name, decl_id: ids.fresh() })
    }

    /// Same declaration, new internal name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        DeclInfo { name: self.name.renamed(name), decl_id: self.decl_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_monotonic() {
        let ids = IdAllocator::new();
        let a = ids.fresh();
        let b = ids.fresh();
        let c = ids.fresh();
        assert!(a < b && b < c);
        assert_eq!(ids.allocated(), 3);
    }

    #[test]
    fn test_same_name_distinct_ids() {
        let ids = IdAllocator::new();
        let a = DeclInfo::new(&ids, Id::new("x"), NodeKind::DeclarationVariable).unwrap();
        let b = DeclInfo::new(&ids, Id::new("x"), NodeKind::DeclarationVariable).unwrap();
        assert_eq!(a.name, b.name);
        assert_ne!(a.decl_id, b.decl_id);
    }

    #[test]
    fn test_empty_name_rejected() {
        let ids = IdAllocator::new();
        let err = DeclInfo::new(&ids, Id::new(""), NodeKind::StructField).unwrap_err();
        assert!(matches!(err, IrError::EmptyName { kind: NodeKind::StructField, .. }));
        assert_eq!(ids.allocated(), 0);
    }

    #[test]
    fn test_renamed_keeps_original() {
        let id = Id::new("foo").renamed("foo$1");
        assert_eq!(id.name, "foo$1");
        assert_eq!(id.original_name, "foo");
        assert_eq!(id.to_string(), "foo");
        assert!(id.is_renamed());
    }
}
