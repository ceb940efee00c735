use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A location in a source file. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub fn new(line: u32, column: u32) -> Self {
        SourcePosition { line, column }
    }
}

/// Source span attached to IR nodes.
///
/// A span may be unset (`SourceInfo::invalid()`); composite nodes built
/// without an explicit span adopt the span of a key child, and spans are
/// combined with [`SourceInfo::merge`] when metadata is attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SourceInfo {
    file: Option<Arc<str>>,
    start: SourcePosition,
    end: SourcePosition,
    valid: bool,
}

impl SourceInfo {
    /// Creates a span covering `start..end` in `file`.
    pub fn new(file: Option<Arc<str>>, start: SourcePosition, end: SourcePosition) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        SourceInfo { file, start, end, valid: true }
    }

    /// Convenience constructor for a span on a single line.
    pub fn on_line(file: &str, line: u32, start_column: u32, end_column: u32) -> Self {
        SourceInfo::new(
            Some(Arc::from(file)),
            SourcePosition::new(line, start_column),
            SourcePosition::new(line, end_column),
        )
    }

    /// The unset location.
    pub fn invalid() -> Self {
        SourceInfo::default()
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn start(&self) -> SourcePosition {
        self.start
    }

    pub fn end(&self) -> SourcePosition {
        self.end
    }

    /// Union of two spans. An unset span is the identity element; spans from
    /// different files cannot be combined and the receiver wins.
    pub fn merge(&self, other: &SourceInfo) -> SourceInfo {
        match (self.valid, other.valid) {
            (false, _) => other.clone(),
            (_, false) => self.clone(),
            _ if self.file != other.file => self.clone(),
            _ => SourceInfo {
                file: self.file.clone(),
                start: self.start.min(other.start),
                end: self.end.max(other.end),
                valid: true,
            },
        }
    }

    /// Returns `self` when set, otherwise the span produced by `fallback`.
    pub fn or_else(self, fallback: impl FnOnce() -> SourceInfo) -> SourceInfo {
        if self.valid { self } else { fallback() }
    }

    /// `file(line:column)` or `line:column` when the file is unknown; empty
    /// for an unset span.
    pub fn to_position_string(&self) -> String {
        if !self.valid {
            return String::new();
        }
        match &self.file {
            Some(file) => format!("{}({}:{})", file, self.start.line, self.start.column),
            None => format!("{}:{}", self.start.line, self.start.column),
        }
    }

    /// Orders spans by file then start position; unset spans sort first.
    pub fn compare(&self, other: &SourceInfo) -> Ordering {
        (self.valid, &self.file, self.start, self.end).cmp(&(other.valid, &other.file, other.start, other.end))
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return write!(f, "<unknown>");
        }
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
        }
        write!(
            f,
            "{}:{}-{}:{}",
            self.start.line, self.start.column, self.end.line, self.end.column
        )
    }
}

/// Serialized shape of a [`SourceInfo`]; unset spans serialize as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfoRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceInfo {
    pub fn to_repr(&self) -> Option<SourceInfoRepr> {
        self.valid.then(|| SourceInfoRepr {
            file: self.file().map(str::to_string),
            start: self.start,
            end: self.end,
        })
    }

    pub fn from_repr(repr: Option<SourceInfoRepr>) -> SourceInfo {
        match repr {
            Some(r) => SourceInfo::new(r.file.map(Arc::from), r.start, r.end),
            None => SourceInfo::invalid(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_with_unset_is_identity() {
        let a = SourceInfo::on_line("a.p4", 3, 4, 9);
        assert_eq!(SourceInfo::invalid().merge(&a), a);
        assert_eq!(a.merge(&SourceInfo::invalid()), a);
        assert!(!SourceInfo::invalid().merge(&SourceInfo::invalid()).is_valid());
    }

    #[test]
    fn test_merge_unions_spans() {
        let a = SourceInfo::on_line("a.p4", 3, 4, 9);
        let b = SourceInfo::new(
            Some(Arc::from("a.p4")),
            SourcePosition::new(2, 0),
            SourcePosition::new(5, 1),
        );
        let merged = a.merge(&b);
        assert_eq!(merged.start(), SourcePosition::new(2, 0));
        assert_eq!(merged.end(), SourcePosition::new(5, 1));
    }

    #[test]
    fn test_merge_across_files_keeps_receiver() {
        let a = SourceInfo::on_line("a.p4", 3, 4, 9);
        let b = SourceInfo::on_line("b.p4", 1, 0, 2);
        assert_eq!(a.merge(&b), a);
    }

    #[test]
    fn test_or_else_adopts_fallback_only_when_unset() {
        let a = SourceInfo::on_line("a.p4", 3, 4, 9);
        let b = SourceInfo::on_line("a.p4", 7, 0, 1);
        assert_eq!(a.clone().or_else(|| b.clone()), a);
        assert_eq!(SourceInfo::invalid().or_else(|| b.clone()), b);
    }

    #[test]
    fn test_position_string() {
        assert_eq!(SourceInfo::on_line("a.p4", 3, 4, 9).to_position_string(), "a.p4(3:4)");
        assert_eq!(SourceInfo::invalid().to_position_string(), "");
    }
}
