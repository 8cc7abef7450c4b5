use clap::Args;
use stagehand::{Bootstrap, DeployEnv, MongoConn, OutputFormat, StagehandConfig};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Arguments for the Provision command
#[derive(Args, Default)]
pub struct ProvisionArgs {
    /// Override the configured deployment environment: development or production
    #[clap(short, long)]
    pub env: Option<String>,

    /// Print the catalog that would be applied, without connecting
    #[clap(long)]
    pub dry_run: bool,
}

#[derive(Tabled)]
struct PlanRow {
    database: String,
    collection: String,
    index: String,
    unique: bool,
    #[tabled(rename = "expireAfterSeconds")]
    expire_after: String,
}

pub fn run(config: &StagehandConfig, args: ProvisionArgs, output_format: OutputFormat) {
    let environment = match &args.env {
        Some(name) => match DeployEnv::from_str(name) {
            Some(env) => env,
            None => {
                eprintln!(
                    "ERROR: Unknown environment '{}'. Available: development, production",
                    name
                );
                std::process::exit(1);
            }
        },
        None => config.environment,
    };

    let bootstrap = Bootstrap::new(environment, config);

    if args.dry_run {
        print_plan(&bootstrap, output_format);
        return;
    }

    let conn = match MongoConn::connect(&config.mongo_uri) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let report = bootstrap.run(&conn);

    match output_format {
        OutputFormat::Json | OutputFormat::JsonPretty => {
            match report.to_json(output_format == OutputFormat::JsonPretty) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error serializing report: {}", e),
            }
        }
        OutputFormat::Table | OutputFormat::Markdown => {
            println!("{}", report.table(output_format == OutputFormat::Markdown));
            println!();
            println!("{}", report.summary());
        }
    }

    if !report.is_clean() {
        std::process::exit(1);
    }
}

fn print_plan(bootstrap: &Bootstrap, output_format: OutputFormat) {
    let catalog = bootstrap.catalog();

    if output_format.is_json() {
        let result = match output_format {
            OutputFormat::JsonPretty => serde_json::to_string_pretty(&catalog),
            _ => serde_json::to_string(&catalog),
        };
        match result {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing catalog: {}", e),
        }
        return;
    }

    let rows: Vec<PlanRow> = catalog
        .iter()
        .flat_map(|db| {
            db.collections.iter().flat_map(|collection| {
                collection.indexes.iter().map(|index| PlanRow {
                    database: db.name.clone(),
                    collection: collection.name.clone(),
                    index: index.name.clone(),
                    unique: index.unique,
                    expire_after: index
                        .expire_after_secs
                        .map(|secs| secs.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
            })
        })
        .collect();

    let mut table = Table::new(rows);
    match output_format {
        OutputFormat::Markdown => table.with(Style::markdown()),
        _ => table.with(Style::rounded()),
    };
    println!("{}", table);
    println!();
    println!(
        "{} databases, environment {}; dry run, nothing applied",
        catalog.len(),
        bootstrap.environment
    );
}
