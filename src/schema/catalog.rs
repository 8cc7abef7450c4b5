//! The platform schema catalog
//!
//! One descriptor per service database. The reservation TTL is the single
//! value that varies between deployments, so it is a parameter rather than a
//! second copy of the catalog: development keeps holds for 30 days to ease
//! debugging, production purges an unconfirmed hold after 24 hours so it
//! cannot block inventory indefinitely.

use crate::schema::descriptor::{CollectionSpec, DatabaseSpec, IndexSpec};

/// Reservation hold TTL for development deployments (30 days)
pub const DEV_RESERVATION_TTL_SECS: u64 = 2_592_000;

/// Reservation hold TTL for production deployments (24 hours)
pub const PROD_RESERVATION_TTL_SECS: u64 = 86_400;

pub const INVENTORY_DB: &str = "inventory_db";
pub const BOOKING_DB: &str = "booking_db";
pub const ORDER_DB: &str = "order_db";

/// Inventory service schema: venues, events, and reservation holds
pub fn inventory_db(reservation_ttl_secs: u64) -> DatabaseSpec {
    DatabaseSpec::new(
        INVENTORY_DB,
        vec![
            CollectionSpec::new(
                "events",
                vec![
                    IndexSpec::unique("idx_event_id", "id"),
                    IndexSpec::ascending("idx_event_name", "name"),
                    IndexSpec::ascending("idx_event_capacity", "leftCapacity"),
                ],
            ),
            CollectionSpec::new(
                "venues",
                vec![
                    IndexSpec::unique("idx_venue_id", "id"),
                    IndexSpec::ascending("idx_venue_name", "name"),
                ],
            ),
            CollectionSpec::new(
                "reservations",
                vec![
                    IndexSpec::unique("idx_reservation_txn", "transactionId"),
                    IndexSpec::ascending("idx_reservation_event", "eventId"),
                    IndexSpec::ascending("idx_reservation_user", "userId"),
                    IndexSpec::ascending("idx_reservation_status", "status"),
                    IndexSpec::ttl("idx_reservation_ttl", "createdAt", reservation_ttl_secs),
                ],
            ),
        ],
    )
}

/// Booking service schema: customers and booking saga steps
pub fn booking_db() -> DatabaseSpec {
    DatabaseSpec::new(
        BOOKING_DB,
        vec![
            CollectionSpec::new(
                "customers",
                vec![
                    IndexSpec::unique("idx_customer_id", "id"),
                    IndexSpec::unique("idx_customer_email", "email"),
                ],
            ),
            CollectionSpec::new(
                "bookings",
                vec![
                    IndexSpec::unique("idx_booking_txn", "transactionId"),
                    IndexSpec::ascending("idx_booking_user", "userId"),
                    IndexSpec::ascending("idx_booking_event", "eventId"),
                    IndexSpec::ascending("idx_booking_status", "status"),
                    IndexSpec::ascending("idx_booking_created", "createdAt"),
                ],
            ),
        ],
    )
}

/// Order service schema
pub fn order_db() -> DatabaseSpec {
    DatabaseSpec::new(
        ORDER_DB,
        vec![CollectionSpec::new(
            "orders",
            vec![
                IndexSpec::unique("idx_order_txn", "transactionId"),
                IndexSpec::ascending("idx_order_customer", "customerId"),
                IndexSpec::ascending("idx_order_event", "eventId"),
                IndexSpec::ascending("idx_order_status", "status"),
                IndexSpec::ascending("idx_order_placed", "placedAt"),
            ],
        )],
    )
}

/// All three platform databases, in provisioning order
pub fn platform_catalog(reservation_ttl_secs: u64) -> Vec<DatabaseSpec> {
    vec![
        inventory_db(reservation_ttl_secs),
        booking_db(),
        order_db(),
    ]
}
