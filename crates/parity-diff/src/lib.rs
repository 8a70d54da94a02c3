//! Structural comparison of JSON response bodies
//!
//! Bodies are converted into [`Node`], a recursive tagged union, and compared
//! with [`diff`]. Lists are compared as multisets: reordering the elements of
//! a list is never reported, while changed values, changed types, missing or
//! extra keys and surplus items are.
//!
//! # Example
//!
//! ```
//! use parity_diff::{diff_values, DiffCategory};
//! use serde_json::json;
//!
//! let baseline = json!({"packages": ["openssl", "zlib"], "score": 7.5});
//! let candidate = json!({"packages": ["zlib", "openssl"], "score": 9.8});
//!
//! let diffs = diff_values(&baseline, &candidate);
//! assert_eq!(diffs.len(), 1);
//! assert_eq!(diffs.iter().next().unwrap().category, DiffCategory::ValueChanged);
//! ```

mod diff;
mod node;

pub use diff::{diff, diff_values, DiffCategory, DiffPath, DiffSet, Difference, PathSegment};
pub use node::{Node, NodeKind};
