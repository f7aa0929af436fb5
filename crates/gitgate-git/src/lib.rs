//! # gitgate-git
//!
//! Git collaborator layer for gitgate. Defines the [`GitClient`] trait the
//! controllers and gateway are written against, plus a process-backed
//! implementation that shells out to `git` and reads status through git2-rs.

mod client;
mod error;
mod status;
mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use client::GitCli;
pub use error::{Error, Result};
pub use status::RepoStatus;
pub use traits::GitClient;
