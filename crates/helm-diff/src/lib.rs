//! # helm-diff
//!
//! Unified diff parsing and application for Helm artifact changes.
//!
//! A proposed change carries a [`ChangeType`] and diff text; [`validate`]
//! checks the text's structure at propose time, and [`apply`] materializes
//! the new content at apply time against whatever the artifact holds *now*.
//! Hunk context is matched strictly, so a diff produced against content
//! that has since drifted fails with a conflict instead of applying badly.
//!
//! ## Quick Example
//!
//! ```rust
//! use helm_diff::{apply, Applied, ChangeType};
//!
//! let diff = "@@ -1 +1,2 @@\n # Plan\n+status: green\n";
//! let applied = apply(ChangeType::Update, Some("# Plan\n"), diff).unwrap();
//! assert_eq!(
//!     applied,
//!     Applied::Content("# Plan\nstatus: green\n".to_string())
//! );
//! ```

pub mod apply;
pub mod change;
pub mod error;
pub mod patch;

pub use apply::{apply, validate, Applied};
pub use change::ChangeType;
pub use error::DiffError;
pub use patch::{Hunk, HunkLine, Patch};
