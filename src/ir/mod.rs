pub mod annotations;
pub mod blocks;
pub mod capability;
pub mod dbprint;
pub mod declarations;
pub mod diagnostics;
pub mod error;
pub mod expressions;
pub mod identity;
pub mod json;
pub mod node;
pub mod parameters;
pub mod path;
pub mod pipeline;
pub mod source_info;
pub mod statements;
pub mod transforms;
pub mod type_decls;
pub mod types;
pub mod visitor;

pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind, DiagnosticSink, Severity, TracingSink};
pub use error::{IrError, IrResult};
pub use identity::{DeclId, Id, IdAllocator};
pub use node::{Node, NodeKind};
pub use source_info::SourceInfo;
