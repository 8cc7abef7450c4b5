//! Idempotent schema application
//!
//! `Provisioner` reconciles one live database against one [`DatabaseSpec`].
//! Running it any number of times against the same deployment converges on
//! the same collection and index set: missing things are created,
//! pre-existing things are counted and skipped, and an index that exists
//! with *different* options is recorded as a conflict: never replaced,
//! never silently accepted. MongoDB rejects re-creating an index under the
//! same name with different options, and dropping it here could change a
//! live TTL policy mid-flight, so conflicts are a human's call.
//!
//! Collections are created before their indexes; the three platform
//! databases have no cross-collection ordering constraints.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{anyhow, Result};
use mongodb::bson::{Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::sync::Database;
use mongodb::IndexModel;
use serde::Serialize;
use tracing::{info, warn};

use crate::provision::connection::{classify, MongoErrorClass};
use crate::provision::report::{DatabaseReport, IndexConflict};
use crate::schema::{CollectionSpec, DatabaseSpec, IndexSpec};

/// Result of comparing a descriptor against a live database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProvisionStatus {
    /// None of the declared collections exist yet
    NotProvisioned,

    /// Everything declared exists with the declared options
    Current,

    /// Some declared collections or indexes are missing
    Partial {
        missing_collections: Vec<String>,
        missing_indexes: Vec<String>,
    },

    /// At least one declared index exists with different options;
    /// takes precedence over `Partial` since it needs manual intervention
    Drifted { conflicts: Vec<IndexConflict> },
}

/// What a declared index needs on the server
enum Disposition {
    Missing,
    Identical,
    Conflict { found: String },
}

/// An index as reported by `listIndexes`, reduced to what reconciliation
/// compares
#[derive(Debug, Clone, PartialEq)]
struct ServerIndex {
    name: Option<String>,
    keys: Vec<(String, i32)>,
    unique: bool,
    expire_after_secs: Option<u64>,
}

impl From<&IndexModel> for ServerIndex {
    fn from(model: &IndexModel) -> Self {
        let options = model.options.as_ref();
        ServerIndex {
            name: options.and_then(|o| o.name.clone()),
            keys: normalize_keys(&model.keys),
            unique: options.and_then(|o| o.unique).unwrap_or(false),
            expire_after_secs: options
                .and_then(|o| o.expire_after)
                .map(|d| d.as_secs()),
        }
    }
}

/// Key documents come back with int32, int64, or double direction values
/// depending on who created the index; normalize before comparing
fn normalize_keys(keys: &Document) -> Vec<(String, i32)> {
    keys.iter()
        .map(|(field, direction)| {
            let direction = match direction {
                Bson::Int32(v) => *v,
                Bson::Int64(v) => *v as i32,
                Bson::Double(v) => *v as i32,
                _ => 0,
            };
            (field.clone(), direction)
        })
        .collect()
}

fn describe_spec(spec: &IndexSpec) -> String {
    describe(&spec.fields.join(","), spec.unique, spec.expire_after_secs)
}

fn describe_server(index: &ServerIndex) -> String {
    let fields = index
        .keys
        .iter()
        .map(|(field, _)| field.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let mut out = describe(&fields, index.unique, index.expire_after_secs);
    if let Some(name) = &index.name {
        out = format!("{} ({})", out, name);
    }
    out
}

fn describe(fields: &str, unique: bool, expire_after_secs: Option<u64>) -> String {
    let mut out = format!("keys=[{}] unique={}", fields, unique);
    if let Some(secs) = expire_after_secs {
        out.push_str(&format!(" expireAfterSeconds={}", secs));
    }
    out
}

/// Decide what to do about one declared index given the server's index list
fn reconcile(spec: &IndexSpec, server: &[ServerIndex]) -> Disposition {
    let declared_keys = normalize_keys(&spec.keys());

    if let Some(found) = server.iter().find(|s| s.keys == declared_keys) {
        let same_name = found.name.as_deref() == Some(spec.name.as_str());
        let same_options =
            found.unique == spec.unique && found.expire_after_secs == spec.expire_after_secs;
        if same_name && same_options {
            return Disposition::Identical;
        }
        return Disposition::Conflict {
            found: describe_server(found),
        };
    }

    // no key match; a name collision with a different key set is a conflict too
    if let Some(found) = server
        .iter()
        .find(|s| s.name.as_deref() == Some(spec.name.as_str()))
    {
        return Disposition::Conflict {
            found: describe_server(found),
        };
    }

    Disposition::Missing
}

fn index_model(spec: &IndexSpec) -> IndexModel {
    let mut options = IndexOptions::builder()
        .name(spec.name.clone())
        .unique(spec.unique)
        .build();
    options.expire_after = spec.expire_after_secs.map(Duration::from_secs);

    IndexModel::builder().keys(spec.keys()).options(options).build()
}

/// Applies a schema descriptor to one database
///
/// The handle is explicit: every call states which database it targets.
/// Only schema-level metadata (collections, indexes) is touched; document
/// data is never read or written here.
pub struct Provisioner<'a> {
    db: &'a Database,
}

impl<'a> Provisioner<'a> {
    pub fn new(db: &'a Database) -> Self {
        Provisioner { db }
    }

    /// Apply the descriptor, returning what was created, what already
    /// existed, and any option conflicts. `Err` means this database could
    /// not be provisioned at all (connectivity, authorization); the caller
    /// is expected to continue with the remaining databases.
    pub fn apply(&self, spec: &DatabaseSpec) -> Result<DatabaseReport> {
        spec.validate()?;

        let mut report = DatabaseReport::new(&spec.name);
        let existing = self.existing_collections(spec)?;

        for collection in &spec.collections {
            self.ensure_collection(spec, collection, &existing, &mut report)?;
        }
        for collection in &spec.collections {
            self.ensure_indexes(spec, collection, &mut report)?;
        }

        info!(
            database = spec.name.as_str(),
            collections_created = report.collections_created.len(),
            indexes_created = report.indexes_created.len(),
            conflicts = report.conflicts.len(),
            "schema applied"
        );
        Ok(report)
    }

    /// Read-only comparison of the descriptor against the live database
    pub fn check(&self, spec: &DatabaseSpec) -> Result<ProvisionStatus> {
        spec.validate()?;

        let existing = self.existing_collections(spec)?;
        if spec.collections.iter().all(|c| !existing.contains(&c.name)) {
            return Ok(ProvisionStatus::NotProvisioned);
        }

        let mut missing_collections = Vec::new();
        let mut missing_indexes = Vec::new();
        let mut conflicts = Vec::new();

        for collection in &spec.collections {
            if !existing.contains(&collection.name) {
                missing_collections.push(collection.name.clone());
                missing_indexes.extend(
                    collection
                        .indexes
                        .iter()
                        .map(|i| format!("{}.{}", collection.name, i.name)),
                );
                continue;
            }

            let server = self.server_indexes(spec, collection)?;
            for index in &collection.indexes {
                match reconcile(index, &server) {
                    Disposition::Missing => {
                        missing_indexes.push(format!("{}.{}", collection.name, index.name));
                    }
                    Disposition::Identical => {}
                    Disposition::Conflict { found } => {
                        conflicts.push(IndexConflict {
                            collection: collection.name.clone(),
                            index: index.name.clone(),
                            declared: describe_spec(index),
                            found,
                        });
                    }
                }
            }
        }

        if !conflicts.is_empty() {
            Ok(ProvisionStatus::Drifted { conflicts })
        } else if missing_collections.is_empty() && missing_indexes.is_empty() {
            Ok(ProvisionStatus::Current)
        } else {
            Ok(ProvisionStatus::Partial {
                missing_collections,
                missing_indexes,
            })
        }
    }

    fn existing_collections(&self, spec: &DatabaseSpec) -> Result<HashSet<String>> {
        let names = self
            .db
            .list_collection_names(None)
            .map_err(|e| anyhow!("Cannot list collections in {}: {}", spec.name, e))?;
        Ok(names.into_iter().collect())
    }

    fn ensure_collection(
        &self,
        spec: &DatabaseSpec,
        collection: &CollectionSpec,
        existing: &HashSet<String>,
        report: &mut DatabaseReport,
    ) -> Result<()> {
        if existing.contains(&collection.name) {
            report.collections_preexisting.push(collection.name.clone());
            return Ok(());
        }

        match self.db.create_collection(&collection.name, None) {
            Ok(()) => {
                info!(
                    database = spec.name.as_str(),
                    collection = collection.name.as_str(),
                    "collection created"
                );
                report.collections_created.push(collection.name.clone());
                Ok(())
            }
            // lost a race with another bootstrap run
            Err(e) if classify(&e) == MongoErrorClass::NamespaceExists => {
                report.collections_preexisting.push(collection.name.clone());
                Ok(())
            }
            Err(e) => Err(anyhow!(
                "Failed to create collection {}.{}: {}",
                spec.name,
                collection.name,
                e
            )),
        }
    }

    fn ensure_indexes(
        &self,
        spec: &DatabaseSpec,
        collection: &CollectionSpec,
        report: &mut DatabaseReport,
    ) -> Result<()> {
        let server = self.server_indexes(spec, collection)?;
        let coll = self.db.collection::<Document>(&collection.name);

        for index in &collection.indexes {
            let label = format!("{}.{}", collection.name, index.name);
            match reconcile(index, &server) {
                Disposition::Identical => {
                    report.indexes_preexisting.push(label);
                }
                Disposition::Missing => match coll.create_index(index_model(index), None) {
                    Ok(_) => {
                        info!(
                            database = spec.name.as_str(),
                            index = label.as_str(),
                            "index created"
                        );
                        report.indexes_created.push(label);
                    }
                    // raced against a concurrent run that created a
                    // different definition under our name/keys
                    Err(e) if classify(&e) == MongoErrorClass::IndexConflict => {
                        warn!(
                            database = spec.name.as_str(),
                            index = label.as_str(),
                            "index conflicts with a concurrently created definition"
                        );
                        report.conflicts.push(IndexConflict {
                            collection: collection.name.clone(),
                            index: index.name.clone(),
                            declared: describe_spec(index),
                            found: format!("rejected by server: {}", e),
                        });
                    }
                    Err(e) => {
                        return Err(anyhow!(
                            "Failed to create index {}.{}: {}",
                            spec.name,
                            label,
                            e
                        ));
                    }
                },
                Disposition::Conflict { found } => {
                    warn!(
                        database = spec.name.as_str(),
                        index = label.as_str(),
                        found = found.as_str(),
                        "index exists with different options, leaving in place"
                    );
                    report.conflicts.push(IndexConflict {
                        collection: collection.name.clone(),
                        index: index.name.clone(),
                        declared: describe_spec(index),
                        found,
                    });
                }
            }
        }

        Ok(())
    }

    fn server_indexes(
        &self,
        spec: &DatabaseSpec,
        collection: &CollectionSpec,
    ) -> Result<Vec<ServerIndex>> {
        let coll = self.db.collection::<Document>(&collection.name);
        let cursor = coll.list_indexes(None).map_err(|e| {
            anyhow!(
                "Cannot list indexes on {}.{}: {}",
                spec.name,
                collection.name,
                e
            )
        })?;

        let mut indexes = Vec::new();
        for model in cursor {
            let model = model.map_err(|e| {
                anyhow!(
                    "Cannot read index listing on {}.{}: {}",
                    spec.name,
                    collection.name,
                    e
                )
            })?;
            indexes.push(ServerIndex::from(&model));
        }
        Ok(indexes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    fn server(name: &str, field: &str, unique: bool, ttl: Option<u64>) -> ServerIndex {
        ServerIndex {
            name: Some(name.to_string()),
            keys: vec![(field.to_string(), 1)],
            unique,
            expire_after_secs: ttl,
        }
    }

    fn id_index() -> ServerIndex {
        ServerIndex {
            name: Some("_id_".to_string()),
            keys: vec![("_id".to_string(), 1)],
            unique: false,
            expire_after_secs: None,
        }
    }

    #[test]
    fn test_reconcile_missing() {
        let spec = IndexSpec::unique("idx_txn", "transactionId");
        let disposition = reconcile(&spec, &[id_index()]);
        assert!(matches!(disposition, Disposition::Missing));
    }

    #[test]
    fn test_reconcile_identical() {
        let spec = IndexSpec::unique("idx_txn", "transactionId");
        let existing = [id_index(), server("idx_txn", "transactionId", true, None)];
        assert!(matches!(
            reconcile(&spec, &existing),
            Disposition::Identical
        ));

        let ttl = IndexSpec::ttl("idx_ttl", "createdAt", 86_400);
        let existing = [server("idx_ttl", "createdAt", false, Some(86_400))];
        assert!(matches!(reconcile(&ttl, &existing), Disposition::Identical));
    }

    #[test]
    fn test_reconcile_ttl_change_is_conflict() {
        // a deployment provisioned with the 30-day development window,
        // re-run with the 24-hour production window
        let spec = IndexSpec::ttl("idx_reservation_ttl", "createdAt", 86_400);
        let existing = [server(
            "idx_reservation_ttl",
            "createdAt",
            false,
            Some(2_592_000),
        )];

        match reconcile(&spec, &existing) {
            Disposition::Conflict { found } => {
                assert!(found.contains("expireAfterSeconds=2592000"), "{}", found);
            }
            _ => panic!("expected a conflict"),
        }
    }

    #[test]
    fn test_reconcile_uniqueness_change_is_conflict() {
        let spec = IndexSpec::unique("idx_txn", "transactionId");
        let existing = [server("idx_txn", "transactionId", false, None)];
        assert!(matches!(
            reconcile(&spec, &existing),
            Disposition::Conflict { .. }
        ));
    }

    #[test]
    fn test_reconcile_same_keys_different_name_is_conflict() {
        let spec = IndexSpec::unique("idx_txn", "transactionId");
        let existing = [server("transactionId_1", "transactionId", true, None)];
        assert!(matches!(
            reconcile(&spec, &existing),
            Disposition::Conflict { .. }
        ));
    }

    #[test]
    fn test_reconcile_name_collision_is_conflict() {
        let spec = IndexSpec::unique("idx_txn", "transactionId");
        let existing = [server("idx_txn", "legacyField", false, None)];
        assert!(matches!(
            reconcile(&spec, &existing),
            Disposition::Conflict { .. }
        ));
    }

    #[test]
    fn test_normalize_keys_accepts_numeric_variants() {
        // int32, int64, and double all mean "ascending" depending on the
        // client that created the index
        let int32 = doc! { "createdAt": 1_i32 };
        let int64 = doc! { "createdAt": 1_i64 };
        let double = doc! { "createdAt": 1.0 };

        let expected = vec![("createdAt".to_string(), 1)];
        assert_eq!(normalize_keys(&int32), expected);
        assert_eq!(normalize_keys(&int64), expected);
        assert_eq!(normalize_keys(&double), expected);
    }

    #[test]
    fn test_server_index_from_model() {
        let model = index_model(&IndexSpec::ttl("idx_ttl", "createdAt", 86_400));
        let server = ServerIndex::from(&model);

        assert_eq!(server.name.as_deref(), Some("idx_ttl"));
        assert_eq!(server.keys, vec![("createdAt".to_string(), 1)]);
        assert!(!server.unique);
        assert_eq!(server.expire_after_secs, Some(86_400));
    }

    #[test]
    fn test_index_model_carries_options() {
        let model = index_model(&IndexSpec::unique("idx_event_id", "id"));
        let options = model.options.unwrap();

        assert_eq!(options.name.as_deref(), Some("idx_event_id"));
        assert_eq!(options.unique, Some(true));
        assert_eq!(options.expire_after, None);
        assert_eq!(model.keys, doc! { "id": 1_i32 });
    }

    #[test]
    fn test_describe_spec() {
        let ttl = IndexSpec::ttl("idx_ttl", "createdAt", 86_400);
        assert_eq!(
            describe_spec(&ttl),
            "keys=[createdAt] unique=false expireAfterSeconds=86400"
        );

        let unique = IndexSpec::unique("idx_txn", "transactionId");
        assert_eq!(describe_spec(&unique), "keys=[transactionId] unique=true");
    }
}
