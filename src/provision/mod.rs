//! Provisioning
//!
//! Everything that touches a live MongoDB deployment:
//!
//! ```text
//! provision/
//! ├── connection     # sync client wrapper + server error classification
//! ├── apply          # idempotent schema application and drift checking
//! ├── credentials    # per-service scoped users (production)
//! ├── fixtures       # deterministic development sample data
//! └── report         # per-database and whole-run summaries
//! ```
//!
//! The provisioner mutates schema-level metadata only (collections, indexes,
//! users); it never rewrites document data. Each call names the database it
//! targets through an explicit handle; there is no ambient "current
//! database" state anywhere in this module.

pub mod apply;
pub mod connection;
pub mod credentials;
pub mod fixtures;
pub mod report;

pub use apply::{Provisioner, ProvisionStatus};
pub use connection::{classify, classify_code, error_code, MongoConn, MongoErrorClass};
pub use credentials::CredentialScoper;
pub use fixtures::FixtureLoader;
pub use report::{
    BootstrapReport, DatabaseReport, FixtureSummary, IndexConflict, UserOutcome,
};

#[cfg(feature = "display")]
pub use report::OutputFormat;
