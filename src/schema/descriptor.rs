//! Schema descriptor types
//!
//! A descriptor names the collections a database must hold and the indexes
//! each collection must carry. Descriptors are plain data: validating and
//! applying them is the provisioner's job, so the same descriptor can drive
//! provisioning, drift checking, and dry-run output.

use anyhow::{anyhow, Result};
use mongodb::bson::Document;
use serde::Serialize;

/// One index requirement on a collection
///
/// All platform indexes are single-direction ascending, so only field names
/// are recorded. `unique` indexes exist for external correlation keys
/// (business identity or the saga idempotency token), never for the `_id`
/// surrogate: the unique `transactionId` indexes are what make re-delivered
/// saga messages collapse into a duplicate-key rejection instead of a second
/// financial effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSpec {
    pub name: String,
    /// Field names in index order
    pub fields: Vec<String>,
    pub unique: bool,
    /// TTL window; the server purges documents this many seconds after the
    /// indexed timestamp. At most one per collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after_secs: Option<u64>,
}

impl IndexSpec {
    /// Plain ascending secondary index
    pub fn ascending(name: &str, field: &str) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            fields: vec![field.to_string()],
            unique: false,
            expire_after_secs: None,
        }
    }

    /// Unique index on an external correlation key
    pub fn unique(name: &str, field: &str) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            fields: vec![field.to_string()],
            unique: true,
            expire_after_secs: None,
        }
    }

    /// TTL index on a timestamp field
    pub fn ttl(name: &str, field: &str, expire_after_secs: u64) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            fields: vec![field.to_string()],
            unique: false,
            expire_after_secs: Some(expire_after_secs),
        }
    }

    /// Key document in MongoDB's createIndexes form
    pub fn keys(&self) -> Document {
        let mut keys = Document::new();
        for field in &self.fields {
            keys.insert(field.clone(), 1_i32);
        }
        keys
    }

    pub fn is_ttl(&self) -> bool {
        self.expire_after_secs.is_some()
    }
}

/// A collection and the indexes it must carry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSpec {
    pub name: String,
    pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
    pub fn new(name: &str, indexes: Vec<IndexSpec>) -> CollectionSpec {
        CollectionSpec {
            name: name.to_string(),
            indexes,
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen_names = Vec::new();
        let mut seen_keys = Vec::new();
        let mut ttl_count = 0;

        for index in &self.indexes {
            if index.fields.is_empty() {
                return Err(anyhow!(
                    "index {}.{} declares no fields",
                    self.name,
                    index.name
                ));
            }
            if seen_names.contains(&&index.name) {
                return Err(anyhow!(
                    "duplicate index name {}.{}",
                    self.name,
                    index.name
                ));
            }
            seen_names.push(&index.name);

            if seen_keys.contains(&index.fields) {
                return Err(anyhow!(
                    "duplicate key set {:?} on collection {}",
                    index.fields,
                    self.name
                ));
            }
            seen_keys.push(index.fields.clone());

            // Unique indexes guard correlation keys; the _id surrogate is
            // already unique and carries no idempotency meaning.
            if index.unique && index.fields.iter().all(|f| f == "_id") {
                return Err(anyhow!(
                    "unique index {}.{} targets only the _id surrogate",
                    self.name,
                    index.name
                ));
            }

            if index.is_ttl() {
                ttl_count += 1;
                if index.fields.len() != 1 {
                    return Err(anyhow!(
                        "TTL index {}.{} must cover exactly one timestamp field",
                        self.name,
                        index.name
                    ));
                }
                if index.unique {
                    return Err(anyhow!(
                        "TTL index {}.{} cannot also be unique",
                        self.name,
                        index.name
                    ));
                }
            }
        }

        if ttl_count > 1 {
            return Err(anyhow!(
                "collection {} declares {} TTL indexes, at most one is allowed",
                self.name,
                ttl_count
            ));
        }

        Ok(())
    }

    /// The TTL index, if this collection declares one
    pub fn ttl_index(&self) -> Option<&IndexSpec> {
        self.indexes.iter().find(|i| i.is_ttl())
    }
}

/// The full schema requirement for one database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSpec {
    pub name: String,
    pub collections: Vec<CollectionSpec>,
}

impl DatabaseSpec {
    pub fn new(name: &str, collections: Vec<CollectionSpec>) -> DatabaseSpec {
        DatabaseSpec {
            name: name.to_string(),
            collections,
        }
    }

    /// Declaration-time validation, run before any database is touched
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::new();
        for collection in &self.collections {
            if seen.contains(&&collection.name) {
                return Err(anyhow!(
                    "database {} declares collection {} twice",
                    self.name,
                    collection.name
                ));
            }
            seen.push(&collection.name);
            collection.validate()?;
        }
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_keys_document() {
        let index = IndexSpec::unique("idx_txn", "transactionId");
        assert_eq!(index.keys(), doc! { "transactionId": 1_i32 });

        let compound = IndexSpec {
            name: "idx_pair".to_string(),
            fields: vec!["eventId".to_string(), "userId".to_string()],
            unique: false,
            expire_after_secs: None,
        };
        assert_eq!(compound.keys(), doc! { "eventId": 1_i32, "userId": 1_i32 });
    }

    #[test]
    fn test_valid_collection() {
        let spec = CollectionSpec::new(
            "reservations",
            vec![
                IndexSpec::unique("idx_txn", "transactionId"),
                IndexSpec::ascending("idx_status", "status"),
                IndexSpec::ttl("idx_ttl", "createdAt", 86_400),
            ],
        );
        assert!(spec.validate().is_ok());
        assert_eq!(spec.ttl_index().map(|i| i.name.as_str()), Some("idx_ttl"));
    }

    #[test]
    fn test_rejects_two_ttl_indexes() {
        let spec = CollectionSpec::new(
            "reservations",
            vec![
                IndexSpec::ttl("idx_ttl_a", "createdAt", 86_400),
                IndexSpec::ttl("idx_ttl_b", "updatedAt", 3_600),
            ],
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_index_names() {
        let spec = CollectionSpec::new(
            "events",
            vec![
                IndexSpec::unique("idx_id", "id"),
                IndexSpec::ascending("idx_id", "name"),
            ],
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_key_sets() {
        let spec = CollectionSpec::new(
            "events",
            vec![
                IndexSpec::unique("idx_id", "id"),
                IndexSpec::ascending("idx_id_again", "id"),
            ],
        );
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_rejects_unique_on_surrogate_only() {
        let spec = CollectionSpec::new("events", vec![IndexSpec::unique("idx_oid", "_id")]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_rejects_unique_ttl() {
        let mut index = IndexSpec::ttl("idx_ttl", "createdAt", 60);
        index.unique = true;
        let spec = CollectionSpec::new("reservations", vec![index]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_collections() {
        let spec = DatabaseSpec::new(
            "inventory_db",
            vec![
                CollectionSpec::new("events", vec![]),
                CollectionSpec::new("events", vec![]),
            ],
        );
        assert!(spec.validate().is_err());
    }
}
