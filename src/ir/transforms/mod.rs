pub mod annotation_filter;
pub mod duplicate_check;
pub mod rename;

pub use annotation_filter::AnnotationFilter;
pub use duplicate_check::DuplicateDeclarationCheck;
pub use rename::RenameDeclarations;
