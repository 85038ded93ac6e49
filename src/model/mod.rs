//! Value container and views
//!
//! [`UpLook`] owns the raw values, prepares them into a tree of literals and lookup
//! expressions, and hands out [`View`]s for reading one nesting level at a time.

pub mod container;
mod node;
pub mod view;

pub use container::UpLook;
pub use view::{ExportOptions, View};
