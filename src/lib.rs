//! # tracked-temp
//!
//! Provides the [`Temp`] struct, which creates uniquely named temporary files,
//! directories and write streams and, once tracking is enabled, removes them
//! again on demand or when the process exits.
//!
//! ```
//! use tracked_temp::Temp;
//!
//! #[tokio::main]
//! async fn main() {
//!     let temp = Temp::new();
//!     temp.track(true);
//!
//!     let dir = temp.mkdir("work-").await.unwrap();
//!     let file = temp.open_sync("notes-").unwrap();
//!     assert!(dir.is_dir());
//!     assert!(file.path().is_file());
//!
//!     // Without this call, both would be removed at process exit.
//!     let report = temp.cleanup().await.unwrap();
//!     assert_eq!(report.files.removed, 1);
//!     assert_eq!(report.dirs.removed, 1);
//! }
//! ```
//!
//! Names are made of a prefix, the current date, the process id, a random
//! token and a suffix. They are unlikely to collide but not unpredictable;
//! resources are created exclusively and a collision is reported as
//! [`Error::PathCollision`].
//!
//! ## Features
//!
//! * `uuid` - (Default) Draws the random part of generated names from a
//!            [`uuid`](https://crates.io/crates/uuid) v4. Without it, a randomly
//!            seeded hasher is used.

// Document crate features on docs.rs.
#![cfg_attr(docsrs, feature(doc_cfg))]
// Required for installing the exit hook.
#![allow(unsafe_code)]

mod affixes;
mod cleanup;
pub mod config;
mod errors;
pub mod exit_hook;
mod random_name;
mod registry;
mod temp;
mod tempdir;
mod tempfile;

pub use affixes::{Affixes, Mode};
pub use cleanup::{CleanupReport, Counts};
pub use errors::Error;
pub use temp::Temp;
pub use tempfile::{OpenFile, WriteStream};
