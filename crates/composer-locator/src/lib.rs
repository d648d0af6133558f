//! Target Resolver: finds the editable surface a prompt should go into.
//!
//! Resolution is a pure function of one [`page_structure::DomSnapshot`]; the
//! caller takes a fresh snapshot per attempt, so targets are never cached
//! across attempts.

pub mod resolver;
pub mod substitute;
pub mod types;

pub use resolver::TargetResolver;
pub use substitute::nearest_visible_rich_editable;
pub use types::{EditableTarget, Resolution};
