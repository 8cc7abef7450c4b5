use clap::Args;
use stagehand::{
    Bootstrap, MongoConn, OutputFormat, Provisioner, ProvisionStatus, StagehandConfig,
};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Status command
#[derive(Args, Default)]
pub struct StatusArgs {}

#[derive(Tabled)]
struct StatusRow {
    database: String,
    status: String,
    detail: String,
}

pub fn run(config: &StagehandConfig, _args: StatusArgs, output_format: OutputFormat) {
    let conn = match MongoConn::connect(&config.mongo_uri) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bootstrap = Bootstrap::from_config(config);
    let mut rows = Vec::new();
    let mut json_entries = Vec::new();
    let mut healthy = true;

    for spec in bootstrap.catalog() {
        let db = conn.database(&spec.name);
        match Provisioner::new(&db).check(&spec) {
            Ok(status) => {
                if matches!(status, ProvisionStatus::Drifted { .. }) {
                    healthy = false;
                }
                rows.push(describe(&spec.name, &status));
                json_entries.push(serde_json::json!({
                    "database": spec.name,
                    "status": status,
                }));
            }
            // an unreachable database does not hide the status of the others
            Err(e) => {
                healthy = false;
                json_entries.push(serde_json::json!({
                    "database": spec.name,
                    "error": format!("{:#}", e),
                }));
                rows.push(StatusRow {
                    database: spec.name.clone(),
                    status: "unreachable".to_string(),
                    detail: format!("{:#}", e),
                });
            }
        }
    }

    if output_format.is_json() {
        let result = match output_format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&json_entries),
            _ => serde_json::to_string(&json_entries),
        };
        match result {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing status: {}", e),
        }
    } else {
        let mut table = Table::new(rows);
        match output_format {
            OutputFormat::Markdown => table.with(Style::markdown()),
            _ => table.with(Style::rounded()),
        };
        println!("{}", table);
    }

    if !healthy {
        std::process::exit(1);
    }
}

fn describe(database: &str, status: &ProvisionStatus) -> StatusRow {
    match status {
        ProvisionStatus::NotProvisioned => StatusRow {
            database: database.to_string(),
            status: "not provisioned".to_string(),
            detail: "run: stagehand provision".to_string(),
        },
        ProvisionStatus::Current => StatusRow {
            database: database.to_string(),
            status: "current".to_string(),
            detail: "-".to_string(),
        },
        ProvisionStatus::Partial {
            missing_collections,
            missing_indexes,
        } => StatusRow {
            database: database.to_string(),
            status: "partial".to_string(),
            detail: format!(
                "{} collection(s), {} index(es) missing",
                missing_collections.len(),
                missing_indexes.len()
            ),
        },
        ProvisionStatus::Drifted { conflicts } => StatusRow {
            database: database.to_string(),
            status: "drifted".to_string(),
            detail: conflicts
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        },
    }
}
