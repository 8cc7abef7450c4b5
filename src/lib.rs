#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Stagehand - schema bootstrap for the ticket reservation platform
//!
//! Stagehand provisions the persistent schema for the platform's three
//! independently owned MongoDB databases (`inventory_db`, `booking_db`,
//! `order_db`) before any service accepts traffic. It is designed to run
//! exactly once per database instance at startup and to be safe on every
//! re-run: pre-existing collections, indexes, users, and fixture rows are
//! tolerated, while genuine option conflicts are surfaced for manual
//! intervention instead of being silently ignored.
//!
//! The schema it applies is the storage contract the saga orchestrator
//! relies on:
//!
//! - unique `transactionId` indexes so re-delivery of a saga message can
//!   never create a duplicate financial effect,
//! - a TTL index on `reservations.createdAt` so an abandoned hold releases
//!   inventory automatically,
//! - `status` indexes for compensation bookkeeping.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `display` | Table rendering for reports | `tabled` |
//! | `cli` | Full CLI binary | `clap`, `tracing-subscriber` |
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - **[`schema`]**: The schema catalog, declared as data
//!   - `descriptor`: database/collection/index specification types
//!   - `catalog`: the three database descriptors, parameterized by
//!     deployment environment
//!
//! - **[`provision`]**: Applying a descriptor to a live database
//!   - `connection`: MongoDB connection wrapper and error classification
//!   - `apply`: the idempotent provisioner and drift checking
//!   - `credentials`: per-service scoped user creation
//!   - `fixtures`: deterministic development sample data
//!   - `report`: per-database and whole-run summaries
//!
//! - **[`bootstrap`]**: One-shot orchestration across all three databases
//!
//! - **[`model`]**: Typed documents the services store in these collections
//!
//! - **[`config`]**: Configuration management
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use stagehand::{Bootstrap, DeployEnv, MongoConn, StagehandConfig};
//!
//! let config = StagehandConfig::new(&None)?;
//! let conn = MongoConn::connect(&config.mongo_uri)?;
//!
//! let report = Bootstrap::from_config(&config).run(&conn);
//! println!("{}", report.summary());
//! if !report.is_clean() {
//!     std::process::exit(1);
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod model;
pub mod provision;
pub mod schema;

// =============================================================================
// Configuration (always available)
// =============================================================================

pub use config::{DeployEnv, StagehandConfig};

// =============================================================================
// Schema catalog
// =============================================================================

pub use schema::{
    booking_db, inventory_db, order_db, platform_catalog, CollectionSpec, DatabaseSpec, IndexSpec,
    DEV_RESERVATION_TTL_SECS, PROD_RESERVATION_TTL_SECS,
};

// =============================================================================
// Provisioning
// =============================================================================

pub use provision::{
    BootstrapReport, CredentialScoper, DatabaseReport, FixtureLoader, IndexConflict, MongoConn,
    Provisioner, ProvisionStatus,
};

#[cfg(feature = "display")]
pub use provision::OutputFormat;

// =============================================================================
// Orchestration
// =============================================================================

pub use bootstrap::Bootstrap;

// =============================================================================
// Typed documents
// =============================================================================

pub use model::{
    Booking, Customer, Event, Order, OrderStatus, Reservation, SagaStatus, Venue, VenueSnapshot,
};
