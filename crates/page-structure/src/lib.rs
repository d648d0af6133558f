//! Deep DOM snapshots and the structural queries run against them.
//!
//! A [`DomSnapshot`] is a flat arena captured by one evaluation of
//! [`SNAPSHOT_SCRIPT`]. It includes every open shadow root, so queries here
//! see the same element tree a user does. Node keys index both the arena and
//! the page-side registry that the snapshot script leaves behind, and are only
//! meaningful until the next snapshot of the same page.

pub mod builder;
pub mod errors;
pub mod pattern;
pub mod query;
pub mod snapshot;
pub mod visibility;

pub use builder::SnapshotBuilder;
pub use errors::StructureError;
pub use pattern::{composer_patterns, send_patterns, AttrMatch, ElementPattern};
pub use query::{closest_form, deep_query, is_within};
pub use snapshot::{ComputedStyle, DomNode, DomSnapshot, NodeKey, Rect, NODE_REGISTRY, SNAPSHOT_SCRIPT};
pub use visibility::{judge_visible, is_visible, VisibilityIssue, VisibilityReport};
