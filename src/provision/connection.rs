//! MongoDB connection management
//!
//! A thin wrapper around the sync client plus classification of the server
//! error codes the bootstrap must treat specially. Idempotency here means
//! catching exactly the "already exists" family of codes and nothing else:
//! connectivity, authorization, and validation failures always propagate.

use anyhow::{anyhow, Result};
use mongodb::bson::doc;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::sync::{Client, Database};

/// Attempt to insert a document whose unique key is already present
pub const DUPLICATE_KEY: i32 = 11000;

/// `create` on a collection that already exists
pub const NAMESPACE_EXISTS: i32 = 48;

/// Index exists with the same name or key set but different options
pub const INDEX_OPTIONS_CONFLICT: i32 = 85;

/// Index exists under the same name with a different key set
pub const INDEX_KEY_SPECS_CONFLICT: i32 = 86;

/// `createUser` for a user that already exists
pub const USER_ALREADY_EXISTS: i32 = 51003;

/// Coarse classification of a server error for idempotency decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MongoErrorClass {
    /// Unique-index rejection; "this row was already written"
    DuplicateKey,
    /// Collection already present; a re-run, not a failure
    NamespaceExists,
    /// Same index, different options; must be surfaced, never ignored
    IndexConflict,
    /// User already present; a re-run, not a failure
    UserExists,
    /// Anything else: connectivity, authorization, validation
    Other,
}

pub fn classify_code(code: i32) -> MongoErrorClass {
    match code {
        DUPLICATE_KEY => MongoErrorClass::DuplicateKey,
        NAMESPACE_EXISTS => MongoErrorClass::NamespaceExists,
        INDEX_OPTIONS_CONFLICT | INDEX_KEY_SPECS_CONFLICT => MongoErrorClass::IndexConflict,
        USER_ALREADY_EXISTS => MongoErrorClass::UserExists,
        _ => MongoErrorClass::Other,
    }
}

/// Extract the server error code from a driver error, if it carries one
pub fn error_code(error: &MongoError) -> Option<i32> {
    match error.kind.as_ref() {
        ErrorKind::Command(e) => Some(e.code),
        ErrorKind::Write(WriteFailure::WriteError(e)) => Some(e.code),
        _ => None,
    }
}

pub fn classify(error: &MongoError) -> MongoErrorClass {
    match error_code(error) {
        Some(code) => classify_code(code),
        None => MongoErrorClass::Other,
    }
}

/// For a failed unordered `insert_many`: the number of duplicate-key
/// rejections, provided duplicate keys are the *only* failures. Any other
/// write error (or a write-concern error) returns `None` so the caller
/// propagates instead of swallowing.
pub fn duplicate_rejections(error: &MongoError) -> Option<usize> {
    match error.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => {
            if failure.write_concern_error.is_some() {
                return None;
            }
            let write_errors = failure.write_errors.as_deref().unwrap_or(&[]);
            let codes: Vec<i32> = write_errors.iter().map(|e| e.code).collect();
            if all_duplicate_key(&codes) {
                Some(codes.len())
            } else {
                None
            }
        }
        ErrorKind::Write(WriteFailure::WriteError(e))
            if classify_code(e.code) == MongoErrorClass::DuplicateKey =>
        {
            Some(1)
        }
        _ => None,
    }
}

fn all_duplicate_key(codes: &[i32]) -> bool {
    !codes.is_empty()
        && codes
            .iter()
            .all(|&code| classify_code(code) == MongoErrorClass::DuplicateKey)
}

/// Sync MongoDB client wrapper
///
/// Hands out explicit per-database handles; every provisioning call states
/// which database it targets. The client itself is lazy: the first command
/// against a database performs server selection, so connectivity failures
/// surface per database rather than at construction.
pub struct MongoConn {
    client: Client,
}

impl MongoConn {
    /// Build a client from a connection string
    pub fn connect(uri: &str) -> Result<MongoConn> {
        let client = Client::with_uri_str(uri)
            .map_err(|e| anyhow!("Invalid MongoDB connection string: {}", e))?;
        Ok(MongoConn { client })
    }

    /// Handle for one named database
    pub fn database(&self, name: &str) -> Database {
        self.client.database(name)
    }

    /// Round-trip a ping through the given database
    pub fn ping(&self, database: &str) -> Result<()> {
        self.client
            .database(database)
            .run_command(doc! { "ping": 1 }, None)
            .map_err(|e| anyhow!("Cannot reach database {}: {}", database, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_code() {
        assert_eq!(classify_code(11000), MongoErrorClass::DuplicateKey);
        assert_eq!(classify_code(48), MongoErrorClass::NamespaceExists);
        assert_eq!(classify_code(85), MongoErrorClass::IndexConflict);
        assert_eq!(classify_code(86), MongoErrorClass::IndexConflict);
        assert_eq!(classify_code(51003), MongoErrorClass::UserExists);

        // unauthorized and host-unreachable style codes stay fatal
        assert_eq!(classify_code(13), MongoErrorClass::Other);
        assert_eq!(classify_code(6), MongoErrorClass::Other);
        assert_eq!(classify_code(0), MongoErrorClass::Other);
    }

    #[test]
    fn test_all_duplicate_key() {
        assert!(all_duplicate_key(&[11000]));
        assert!(all_duplicate_key(&[11000, 11000, 11000]));

        // an empty failure list is not a duplicate-only failure
        assert!(!all_duplicate_key(&[]));
        // one unrelated failure poisons the batch
        assert!(!all_duplicate_key(&[11000, 13]));
        assert!(!all_duplicate_key(&[121]));
    }

    #[test]
    fn test_connect_rejects_malformed_uri() {
        assert!(MongoConn::connect("not-a-connection-string").is_err());
    }

    #[test]
    fn test_connect_accepts_uri_without_reaching_server() {
        // construction is lazy; no server needs to be listening
        assert!(MongoConn::connect("mongodb://localhost:27017").is_ok());
    }
}
