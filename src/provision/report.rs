//! Bootstrap reports
//!
//! The provisioner, credential scoper, and fixture loader all record their
//! outcomes here instead of printing as they go, so one final summary can
//! state per database what was created, what already existed, and which
//! conflicts need a human.

use serde::Serialize;
use std::fmt;

/// A declared index that exists on the server with different options
///
/// Left in place deliberately: replacing it could silently change a TTL
/// policy under live data. The run reports it and exits nonzero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexConflict {
    pub collection: String,
    pub index: String,
    pub declared: String,
    pub found: String,
}

impl fmt::Display for IndexConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: declared {}, found {}",
            self.collection, self.index, self.declared, self.found
        )
    }
}

/// Outcome of scoping a per-service user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserOutcome {
    Created(String),
    AlreadyExists(String),
}

impl fmt::Display for UserOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserOutcome::Created(user) => write!(f, "user {} created", user),
            UserOutcome::AlreadyExists(user) => write!(f, "user {} already existed", user),
        }
    }
}

/// Outcome of best-effort fixture loading
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FixtureSummary {
    pub inserted: u64,
    /// Rows rejected by a unique index because a previous run loaded them
    pub duplicates: u64,
}

impl FixtureSummary {
    pub fn merge(&mut self, other: FixtureSummary) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

/// Everything that happened to one database during a run
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseReport {
    pub database: String,
    pub collections_created: Vec<String>,
    pub collections_preexisting: Vec<String>,
    pub indexes_created: Vec<String>,
    pub indexes_preexisting: Vec<String>,
    pub conflicts: Vec<IndexConflict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixtures: Option<FixtureSummary>,
    pub warnings: Vec<String>,
    /// Fatal failure for this database only; the other databases still run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseReport {
    pub fn new(database: &str) -> DatabaseReport {
        DatabaseReport {
            database: database.to_string(),
            collections_created: Vec::new(),
            collections_preexisting: Vec::new(),
            indexes_created: Vec::new(),
            indexes_preexisting: Vec::new(),
            conflicts: Vec::new(),
            user: None,
            fixtures: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn failed(database: &str, error: &anyhow::Error) -> DatabaseReport {
        let mut report = DatabaseReport::new(database);
        report.error = Some(format!("{:#}", error));
        report
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    /// Succeeded with nothing left for a human to resolve
    pub fn is_clean(&self) -> bool {
        self.succeeded() && self.conflicts.is_empty()
    }

    fn status_line(&self) -> String {
        if let Some(error) = &self.error {
            return format!("✗ {}: {}", self.database, error);
        }

        let mut parts = vec![format!(
            "{} collections created, {} pre-existing; {} indexes created, {} pre-existing",
            self.collections_created.len(),
            self.collections_preexisting.len(),
            self.indexes_created.len(),
            self.indexes_preexisting.len()
        )];
        if !self.conflicts.is_empty() {
            parts.push(format!("{} conflict(s)", self.conflicts.len()));
        }
        if let Some(user) = &self.user {
            parts.push(user.to_string());
        }
        if let Some(fixtures) = &self.fixtures {
            parts.push(format!(
                "{} fixtures inserted, {} already present",
                fixtures.inserted, fixtures.duplicates
            ));
        }

        let mark = if self.is_clean() { "✓" } else { "!" };
        format!("{} {}: {}", mark, self.database, parts.join("; "))
    }
}

/// Whole-run summary across all databases
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    pub environment: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub databases: Vec<DatabaseReport>,
}

impl BootstrapReport {
    pub fn new(environment: &str) -> BootstrapReport {
        BootstrapReport {
            environment: environment.to_string(),
            started_at: chrono::Utc::now(),
            databases: Vec::new(),
        }
    }

    pub fn push(&mut self, report: DatabaseReport) {
        self.databases.push(report);
    }

    /// Every database provisioned and no unresolved conflicts
    pub fn is_clean(&self) -> bool {
        self.databases.iter().all(|d| d.is_clean())
    }

    pub fn conflicts(&self) -> Vec<(&str, &IndexConflict)> {
        self.databases
            .iter()
            .flat_map(|d| d.conflicts.iter().map(move |c| (d.database.as_str(), c)))
            .collect()
    }

    /// Human-readable run summary
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Bootstrap summary ({})", self.environment));
        lines.push("-".repeat(70));
        for db in &self.databases {
            lines.push(format!("  {}", db.status_line()));
        }
        lines.push("-".repeat(70));

        let conflicts = self.conflicts();
        if !conflicts.is_empty() {
            lines.push("Unresolved conflicts requiring manual intervention:".to_string());
            for (database, conflict) in conflicts {
                lines.push(format!("  - {} {}", database, conflict));
            }
        }

        lines.join("\n")
    }

    pub fn to_json(&self, pretty: bool) -> anyhow::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

// =============================================================================
// Display support (feature = "display")
// =============================================================================

/// Output format for CLI commands
#[cfg(feature = "display")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty table with borders (default)
    #[default]
    Table,
    /// Markdown table format
    Markdown,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[cfg(feature = "display")]
impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json | Self::JsonPretty)
    }
}

#[cfg(feature = "display")]
impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "pretty" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "json-pretty" => Ok(Self::JsonPretty),
            _ => Err(format!(
                "unknown output format '{}' (expected table, markdown, json, json-pretty)",
                s
            )),
        }
    }
}

#[cfg(feature = "display")]
mod table {
    use super::*;
    use tabled::settings::Style;
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct DatabaseRow {
        #[tabled(rename = "database")]
        database: String,
        #[tabled(rename = "collections (new/existing)")]
        collections: String,
        #[tabled(rename = "indexes (new/existing)")]
        indexes: String,
        #[tabled(rename = "conflicts")]
        conflicts: usize,
        #[tabled(rename = "user")]
        user: String,
        #[tabled(rename = "fixtures (new/dup)")]
        fixtures: String,
        #[tabled(rename = "result")]
        result: String,
    }

    impl From<&DatabaseReport> for DatabaseRow {
        fn from(report: &DatabaseReport) -> Self {
            DatabaseRow {
                database: report.database.clone(),
                collections: format!(
                    "{}/{}",
                    report.collections_created.len(),
                    report.collections_preexisting.len()
                ),
                indexes: format!(
                    "{}/{}",
                    report.indexes_created.len(),
                    report.indexes_preexisting.len()
                ),
                conflicts: report.conflicts.len(),
                user: report
                    .user
                    .as_ref()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                fixtures: report
                    .fixtures
                    .as_ref()
                    .map(|f| format!("{}/{}", f.inserted, f.duplicates))
                    .unwrap_or_else(|| "-".to_string()),
                result: match (&report.error, report.conflicts.is_empty()) {
                    (Some(error), _) => format!("failed: {}", error),
                    (None, false) => "conflicts".to_string(),
                    (None, true) => "ok".to_string(),
                },
            }
        }
    }

    impl BootstrapReport {
        /// Render the run as a table
        pub fn table(&self, markdown: bool) -> String {
            let rows: Vec<DatabaseRow> = self.databases.iter().map(DatabaseRow::from).collect();
            let mut table = Table::new(rows);
            if markdown {
                table.with(Style::markdown());
            } else {
                table.with(Style::rounded());
            }
            table.to_string()
        }
    }
}
