//! Development fixtures
//!
//! A fixed, deterministic set of sample rows for local development and
//! testing. Loading is best-effort by contract: rows already inserted by a
//! previous run bounce off the unique `id`/`email` indexes as duplicate-key
//! rejections, which the loader counts and moves past. Any other failure
//! propagates to the caller, where it is logged as a warning; fixtures never
//! abort the bootstrap.

use anyhow::{anyhow, Result};
use mongodb::bson::Decimal128;
use mongodb::options::InsertManyOptions;
use mongodb::sync::{Collection, Database};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::model::{Customer, Event, Venue};
use crate::provision::connection::duplicate_rejections;
use crate::provision::report::FixtureSummary;
use crate::schema::{BOOKING_DB, INVENTORY_DB};

pub struct FixtureLoader;

impl FixtureLoader {
    /// Load the fixtures this database should carry, if any
    ///
    /// `order_db` seeds nothing: orders only ever exist as saga outcomes.
    pub fn load_into(db: &Database) -> Result<Option<FixtureSummary>> {
        match db.name() {
            INVENTORY_DB => Self::load_inventory(db).map(Some),
            BOOKING_DB => Self::load_booking(db).map(Some),
            _ => Ok(None),
        }
    }

    fn load_inventory(db: &Database) -> Result<FixtureSummary> {
        let mut summary = FixtureSummary::default();
        summary.merge(Self::insert(
            &db.collection::<Venue>("venues"),
            &Self::sample_venues()?,
        )?);
        summary.merge(Self::insert(
            &db.collection::<Event>("events"),
            &Self::sample_events()?,
        )?);
        Ok(summary)
    }

    fn load_booking(db: &Database) -> Result<FixtureSummary> {
        Self::insert(
            &db.collection::<Customer>("customers"),
            &Self::sample_customers(),
        )
    }

    /// Unordered batch insert that swallows only duplicate-key rejections
    fn insert<T>(collection: &Collection<T>, rows: &[T]) -> Result<FixtureSummary>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync,
    {
        let options = InsertManyOptions::builder().ordered(false).build();

        match collection.insert_many(rows, options) {
            Ok(result) => Ok(FixtureSummary {
                inserted: result.inserted_ids.len() as u64,
                duplicates: 0,
            }),
            Err(e) => match duplicate_rejections(&e) {
                Some(duplicates) => {
                    info!(
                        collection = collection.name(),
                        duplicates, "fixtures already present from a previous run"
                    );
                    Ok(FixtureSummary {
                        inserted: (rows.len() - duplicates) as u64,
                        duplicates: duplicates as u64,
                    })
                }
                None => Err(anyhow!(
                    "Failed to insert fixtures into {}: {}",
                    collection.name(),
                    e
                )),
            },
        }
    }

    pub fn sample_venues() -> Result<Vec<Venue>> {
        Ok(vec![
            Venue::new(
                1,
                "Madison Square Garden",
                "4 Pennsylvania Plaza, New York, NY 10001",
                20_000,
            )?,
            Venue::new(
                2,
                "Staples Center",
                "1111 S Figueroa St, Los Angeles, CA 90015",
                21_000,
            )?,
            Venue::new(
                3,
                "Red Rocks Amphitheatre",
                "18300 W Alameda Pkwy, Morrison, CO 80465",
                9_525,
            )?,
        ])
    }

    pub fn sample_events() -> Result<Vec<Event>> {
        let venues = Self::sample_venues()?;
        let venue = |id: i64| -> Result<&Venue> {
            venues
                .iter()
                .find(|v| v.id == id)
                .ok_or_else(|| anyhow!("no sample venue with id {}", id))
        };

        Ok(vec![
            Event::new(
                1,
                "Rock Concert 2024",
                15_000,
                15_000,
                price("75.50")?,
                venue(1)?,
            )?,
            Event::new(
                2,
                "Basketball Game - Knicks vs Lakers",
                18_000,
                18_000,
                price("120.00")?,
                venue(1)?,
            )?,
            Event::new(
                3,
                "Summer Music Festival",
                9_000,
                9_000,
                price("85.00")?,
                venue(3)?,
            )?,
            Event::new(4, "Jazz Night", 5_000, 5_000, price("45.00")?, venue(1)?)?,
        ])
    }

    pub fn sample_customers() -> Vec<Customer> {
        vec![
            Customer {
                mongo_id: None,
                id: 1,
                name: "John Doe".to_string(),
                email: "john.doe@example.com".to_string(),
                address: "123 Main St, New York, NY 10001".to_string(),
            },
            Customer {
                mongo_id: None,
                id: 2,
                name: "Jane Smith".to_string(),
                email: "jane.smith@example.com".to_string(),
                address: "456 Oak Ave, Los Angeles, CA 90015".to_string(),
            },
            Customer {
                mongo_id: None,
                id: 3,
                name: "Bob Johnson".to_string(),
                email: "bob.johnson@example.com".to_string(),
                address: "789 Pine Rd, Morrison, CO 80465".to_string(),
            },
        ]
    }
}

fn price(s: &str) -> Result<Decimal128> {
    s.parse()
        .map_err(|e| anyhow!("invalid ticket price {}: {:?}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_deterministic_counts() {
        assert_eq!(FixtureLoader::sample_venues().unwrap().len(), 3);
        assert_eq!(FixtureLoader::sample_events().unwrap().len(), 4);
        assert_eq!(FixtureLoader::sample_customers().len(), 3);
    }

    #[test]
    fn test_unique_business_ids() {
        let venue_ids: HashSet<i64> = FixtureLoader::sample_venues()
            .unwrap()
            .iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(venue_ids.len(), 3);

        let event_ids: HashSet<i64> = FixtureLoader::sample_events()
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(event_ids.len(), 4);

        let emails: HashSet<String> = FixtureLoader::sample_customers()
            .iter()
            .map(|c| c.email.clone())
            .collect();
        assert_eq!(emails.len(), 3);
    }

    #[test]
    fn test_events_start_fully_available() {
        for event in FixtureLoader::sample_events().unwrap() {
            assert_eq!(event.left_capacity, event.total_capacity, "{}", event.name);
        }
    }

    #[test]
    fn test_embedded_snapshots_agree_with_venues() {
        let venues = FixtureLoader::sample_venues().unwrap();

        for event in FixtureLoader::sample_events().unwrap() {
            let venue = venues
                .iter()
                .find(|v| v.id == event.venue.id)
                .unwrap_or_else(|| panic!("event {} references unknown venue", event.id));

            assert_eq!(event.venue.name, venue.name);
            assert_eq!(event.venue.address, venue.address);
            assert_eq!(event.venue.total_capacity, venue.total_capacity);
        }
    }

    #[test]
    fn test_event_capacity_fits_venue() {
        for event in FixtureLoader::sample_events().unwrap() {
            assert!(
                event.total_capacity <= event.venue.total_capacity,
                "event {} oversells its venue",
                event.name
            );
        }
    }
}
