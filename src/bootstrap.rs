//! One-shot bootstrap orchestration
//!
//! Runs the full startup sequence synchronously: for each platform database
//! in a fixed order, apply its descriptor, scope its service user, and load
//! its fixtures. The three databases are independent, so a failure on one is
//! captured in its report and the run continues with the rest.

use tracing::{error, info, warn};

use crate::config::{DeployEnv, StagehandConfig};
use crate::provision::report::{BootstrapReport, DatabaseReport};
use crate::provision::{CredentialScoper, FixtureLoader, MongoConn, Provisioner};
use crate::schema::{platform_catalog, DatabaseSpec};

/// Resolved plan for one bootstrap run
pub struct Bootstrap {
    pub environment: DeployEnv,
    pub reservation_ttl_secs: u64,
    pub create_users: bool,
    pub load_fixtures: bool,
    pub service_user: String,
    pub service_password: String,
}

impl Bootstrap {
    /// Resolve a plan for an explicit environment, taking overrides from
    /// the configuration where present
    pub fn new(environment: DeployEnv, config: &StagehandConfig) -> Bootstrap {
        Bootstrap {
            environment,
            reservation_ttl_secs: config
                .reservation_ttl_secs
                .unwrap_or_else(|| environment.reservation_ttl_secs()),
            create_users: config
                .create_users
                .unwrap_or(environment == DeployEnv::Production),
            load_fixtures: config
                .load_fixtures
                .unwrap_or(environment == DeployEnv::Development),
            service_user: config.service_user.clone(),
            service_password: config.service_password.clone(),
        }
    }

    pub fn from_config(config: &StagehandConfig) -> Bootstrap {
        Bootstrap::new(config.environment, config)
    }

    /// The descriptors this run will apply, in provisioning order
    pub fn catalog(&self) -> Vec<DatabaseSpec> {
        platform_catalog(self.reservation_ttl_secs)
    }

    /// Run the whole bootstrap against one deployment
    pub fn run(&self, conn: &MongoConn) -> BootstrapReport {
        info!(
            environment = self.environment.name(),
            reservation_ttl_secs = self.reservation_ttl_secs,
            create_users = self.create_users,
            load_fixtures = self.load_fixtures,
            "starting bootstrap"
        );

        let mut report = BootstrapReport::new(self.environment.name());
        for spec in self.catalog() {
            report.push(self.run_database(conn, &spec));
        }
        report
    }

    fn run_database(&self, conn: &MongoConn, spec: &DatabaseSpec) -> DatabaseReport {
        let db = conn.database(&spec.name);

        let mut db_report = match Provisioner::new(&db).apply(spec) {
            Ok(report) => report,
            Err(e) => {
                error!(database = spec.name.as_str(), "provisioning failed: {:#}", e);
                return DatabaseReport::failed(&spec.name, &e);
            }
        };

        if self.create_users {
            let scoper = CredentialScoper::new(&self.service_user, &self.service_password);
            match scoper.ensure_on(&db) {
                Ok(outcome) => db_report.user = Some(outcome),
                Err(e) => {
                    error!(
                        database = spec.name.as_str(),
                        "user provisioning failed: {:#}", e
                    );
                    db_report.error = Some(format!("{:#}", e));
                    return db_report;
                }
            }
        }

        if self.load_fixtures {
            match FixtureLoader::load_into(&db) {
                Ok(Some(summary)) => db_report.fixtures = Some(summary),
                Ok(None) => {}
                // fixtures are best-effort and never fail the run
                Err(e) => {
                    warn!(
                        database = spec.name.as_str(),
                        "fixture loading failed: {:#}", e
                    );
                    db_report
                        .warnings
                        .push(format!("fixture loading failed: {:#}", e));
                }
            }
        }

        db_report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_defaults_by_environment() {
        let config = StagehandConfig::default();

        let dev = Bootstrap::new(DeployEnv::Development, &config);
        assert_eq!(dev.reservation_ttl_secs, 2_592_000);
        assert!(!dev.create_users);
        assert!(dev.load_fixtures);

        let prod = Bootstrap::new(DeployEnv::Production, &config);
        assert_eq!(prod.reservation_ttl_secs, 86_400);
        assert!(prod.create_users);
        assert!(!prod.load_fixtures);
    }

    #[test]
    fn test_config_overrides_win() {
        let config = StagehandConfig {
            reservation_ttl_secs: Some(600),
            create_users: Some(true),
            load_fixtures: Some(true),
            ..Default::default()
        };

        let plan = Bootstrap::new(DeployEnv::Development, &config);
        assert_eq!(plan.reservation_ttl_secs, 600);
        assert!(plan.create_users);
        assert!(plan.load_fixtures);
    }

    #[test]
    fn test_catalog_order_is_fixed() {
        let plan = Bootstrap::from_config(&StagehandConfig::default());
        let names: Vec<String> = plan.catalog().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["inventory_db", "booking_db", "order_db"]);
    }

    #[test]
    fn test_catalog_carries_plan_ttl() {
        let config = StagehandConfig {
            reservation_ttl_secs: Some(1_234),
            ..Default::default()
        };
        let plan = Bootstrap::new(DeployEnv::Production, &config);

        let catalog = plan.catalog();
        let ttl = catalog[0]
            .collection("reservations")
            .unwrap()
            .ttl_index()
            .unwrap();
        assert_eq!(ttl.expire_after_secs, Some(1_234));
    }
}
