/// State management module
///
/// This module is the core of the application, including:
/// - Identity resolution and the instance tree (instance.rs)
/// - Recursive content-file discovery (scanner.rs)
/// - Sidecar metadata records (meta.rs)
/// - The column-schema database (schema.rs)
/// - The session object composing them all (manager.rs)
/// - Shared data structures (data.rs)

pub mod data;
pub mod instance;
pub mod manager;
pub mod meta;
pub mod scanner;
pub mod schema;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that are fatal to a session.
///
/// Sidecar problems are deliberately not represented here: a missing,
/// corrupt, or unwritable sidecar degrades to an empty record or a
/// skipped write (see meta.rs), never an error the caller must handle.
#[derive(Debug, Error)]
pub enum StateError {
    /// The identity file is missing or not a regular file
    #[error("identity file not found: {}", .0.display())]
    IdentityNotFound(PathBuf),

    /// The embedded column-schema database could not be opened or queried
    #[error("schema store unavailable: {0}")]
    SchemaStore(#[from] rusqlite::Error),
}
