//! Schema catalog
//!
//! The entire persistent schema is declared here as data, not as imperative
//! steps: the provisioner consumes these descriptors and reconciles a live
//! database against them.
//!
//! ```text
//! schema/
//! ├── descriptor    # DatabaseSpec / CollectionSpec / IndexSpec types
//! └── catalog       # the three platform databases, parameterized by TTL
//! ```

pub mod catalog;
pub mod descriptor;

pub use catalog::{
    booking_db, inventory_db, order_db, platform_catalog, BOOKING_DB, DEV_RESERVATION_TTL_SECS,
    INVENTORY_DB, ORDER_DB, PROD_RESERVATION_TTL_SECS,
};
pub use descriptor::{CollectionSpec, DatabaseSpec, IndexSpec};
