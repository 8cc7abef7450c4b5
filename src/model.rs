//! Typed documents for the platform's collections
//!
//! These are the shapes the inventory, booking, and order services store in
//! the collections this crate provisions. Wire names are camelCase to match
//! the documents already in the wild (`transactionId`, `leftCapacity`, ...).
//!
//! The bootstrap itself only writes fixture rows; the structs mainly exist so
//! fixtures and services agree on one definition of each document.

use anyhow::{anyhow, Result};
use mongodb::bson::{oid::ObjectId, DateTime, Decimal128};
use serde::{Deserialize, Serialize};

/// State of an in-flight saga step (reservations and bookings)
///
/// A row is created as `Pending` when the step begins and transitions exactly
/// once: to `Confirmed` when the saga commits, or to `Compensated` when a
/// later step fails and the orchestrator rolls this one back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaStatus {
    Pending,
    Confirmed,
    Compensated,
}

impl SagaStatus {
    /// Only a pending step may still be rolled back
    pub fn can_be_compensated(&self) -> bool {
        matches!(self, SagaStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Confirmed | SagaStatus::Compensated)
    }
}

/// State of an order; orders cancel rather than compensate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A physical venue (inventory_db.venues)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,
    pub id: i64,
    pub name: String,
    pub address: String,
    pub total_capacity: i64,
}

impl Venue {
    pub fn new(id: i64, name: &str, address: &str, total_capacity: i64) -> Result<Venue> {
        if total_capacity < 0 {
            return Err(anyhow!(
                "venue {} declares negative capacity {}",
                id,
                total_capacity
            ));
        }
        Ok(Venue {
            mongo_id: None,
            id,
            name: name.to_string(),
            address: address.to_string(),
            total_capacity,
        })
    }
}

/// Denormalized copy of a venue embedded in an event
///
/// This is a value snapshot taken at event-creation time, not a live
/// reference; later venue edits do not propagate and that staleness is
/// accepted. The snapshot avoids a cross-collection lookup on the hot
/// availability path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueSnapshot {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub total_capacity: i64,
}

impl From<&Venue> for VenueSnapshot {
    fn from(venue: &Venue) -> Self {
        VenueSnapshot {
            id: venue.id,
            name: venue.name.clone(),
            address: venue.address.clone(),
            total_capacity: venue.total_capacity,
        }
    }
}

/// A sellable event (inventory_db.events)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,
    pub id: i64,
    pub name: String,
    pub total_capacity: i64,
    /// Mutable remaining inventory; invariant: 0 <= leftCapacity <= totalCapacity
    pub left_capacity: i64,
    pub ticket_price: Decimal128,
    pub venue: VenueSnapshot,
}

impl Event {
    /// Build an event, enforcing the capacity invariant at construction
    pub fn new(
        id: i64,
        name: &str,
        total_capacity: i64,
        left_capacity: i64,
        ticket_price: Decimal128,
        venue: &Venue,
    ) -> Result<Event> {
        if total_capacity < 0 {
            return Err(anyhow!(
                "event {} declares negative capacity {}",
                id,
                total_capacity
            ));
        }
        if left_capacity < 0 || left_capacity > total_capacity {
            return Err(anyhow!(
                "event {} has leftCapacity {} outside 0..={}",
                id,
                left_capacity,
                total_capacity
            ));
        }
        Ok(Event {
            mongo_id: None,
            id,
            name: name.to_string(),
            total_capacity,
            left_capacity,
            ticket_price,
            venue: VenueSnapshot::from(venue),
        })
    }
}

/// A temporary inventory hold (inventory_db.reservations)
///
/// `transaction_id` is the saga idempotency key: the unique index on it turns
/// a duplicate delivery into a duplicate-key rejection the orchestrator reads
/// as "already attempted". A reservation that is neither confirmed nor
/// compensated within the TTL window is purged by the server's expiry sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,
    pub transaction_id: String,
    pub event_id: i64,
    pub user_id: i64,
    /// Seats held by this reservation
    pub ticket_count: i64,
    /// Event capacity observed when the hold was taken, kept for compensation
    pub original_capacity: i64,
    pub status: SagaStatus,
    pub created_at: DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Reservation {
    pub fn new(
        transaction_id: &str,
        event_id: i64,
        user_id: i64,
        ticket_count: i64,
        original_capacity: i64,
    ) -> Reservation {
        Reservation {
            mongo_id: None,
            transaction_id: transaction_id.to_string(),
            event_id,
            user_id,
            ticket_count,
            original_capacity,
            status: SagaStatus::Pending,
            created_at: DateTime::now(),
            error_message: None,
        }
    }
}

/// A registered customer (booking_db.customers)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,
    pub id: i64,
    pub name: String,
    /// Natural lookup key, unique across customers
    pub email: String,
    pub address: String,
}

/// A booking saga step (booking_db.bookings)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,
    pub transaction_id: String,
    pub user_id: i64,
    pub event_id: i64,
    pub status: SagaStatus,
    pub created_at: DateTime,
}

impl Booking {
    pub fn new(transaction_id: &str, user_id: i64, event_id: i64) -> Booking {
        Booking {
            mongo_id: None,
            transaction_id: transaction_id.to_string(),
            user_id,
            event_id,
            status: SagaStatus::Pending,
            created_at: DateTime::now(),
        }
    }
}

/// A placed order (order_db.orders)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub mongo_id: Option<ObjectId>,
    pub transaction_id: String,
    pub customer_id: i64,
    pub event_id: i64,
    pub status: OrderStatus,
    pub placed_at: DateTime,
}

impl Order {
    pub fn new(transaction_id: &str, customer_id: i64, event_id: i64) -> Order {
        Order {
            mongo_id: None,
            transaction_id: transaction_id.to_string(),
            customer_id,
            event_id,
            status: OrderStatus::Pending,
            placed_at: DateTime::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    fn venue() -> Venue {
        Venue::new(1, "Madison Square Garden", "4 Pennsylvania Plaza", 20000).unwrap()
    }

    fn price(s: &str) -> Decimal128 {
        s.parse().unwrap()
    }

    #[test]
    fn test_event_capacity_invariant() {
        let venue = venue();

        assert!(Event::new(1, "Rock Concert", 15000, 15000, price("75.50"), &venue).is_ok());
        assert!(Event::new(1, "Rock Concert", 15000, 0, price("75.50"), &venue).is_ok());

        // leftCapacity above total
        assert!(Event::new(1, "Rock Concert", 15000, 15001, price("75.50"), &venue).is_err());
        // negative leftCapacity
        assert!(Event::new(1, "Rock Concert", 15000, -1, price("75.50"), &venue).is_err());
        // negative total
        assert!(Event::new(1, "Rock Concert", -5, 0, price("75.50"), &venue).is_err());
    }

    #[test]
    fn test_venue_snapshot_is_a_copy() {
        let mut venue = venue();
        let event = Event::new(2, "Jazz Night", 5000, 5000, price("45.00"), &venue).unwrap();

        venue.name = "Renamed Arena".to_string();
        assert_eq!(event.venue.name, "Madison Square Garden");
        assert_eq!(event.venue.total_capacity, 20000);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let reservation = Reservation::new("txn-1", 1, 42, 2, 15000);
        let doc = bson::to_document(&reservation).unwrap();

        assert!(doc.contains_key("transactionId"));
        assert!(doc.contains_key("eventId"));
        assert!(doc.contains_key("userId"));
        assert!(doc.contains_key("ticketCount"));
        assert!(doc.contains_key("createdAt"));
        assert_eq!(doc.get_str("status").unwrap(), "PENDING");
        // unset _id and errorMessage are omitted, not stored as null
        assert!(!doc.contains_key("_id"));
        assert!(!doc.contains_key("errorMessage"));
    }

    #[test]
    fn test_status_strings() {
        let confirmed = bson::to_bson(&SagaStatus::Confirmed).unwrap();
        assert_eq!(confirmed, bson::Bson::String("CONFIRMED".to_string()));

        let cancelled = bson::to_bson(&OrderStatus::Cancelled).unwrap();
        assert_eq!(cancelled, bson::Bson::String("CANCELLED".to_string()));

        let roundtrip: SagaStatus = bson::from_bson(bson::Bson::String("COMPENSATED".into())).unwrap();
        assert_eq!(roundtrip, SagaStatus::Compensated);
    }

    #[test]
    fn test_saga_status_transitions() {
        assert!(SagaStatus::Pending.can_be_compensated());
        assert!(!SagaStatus::Confirmed.can_be_compensated());
        assert!(!SagaStatus::Pending.is_terminal());
        assert!(SagaStatus::Compensated.is_terminal());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = Event::new(3, "Summer Festival", 9000, 9000, price("85.00"), &venue()).unwrap();
        let doc = bson::to_document(&event).unwrap();

        assert!(doc.contains_key("leftCapacity"));
        assert!(doc.contains_key("totalCapacity"));
        assert!(doc.contains_key("ticketPrice"));
        let embedded = doc.get_document("venue").unwrap();
        assert_eq!(embedded.get_i64("totalCapacity").unwrap(), 20000);
    }
}
