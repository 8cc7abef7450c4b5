//! Per-service scoped credentials (production variant)
//!
//! Each owning service gets one database user holding `readWrite` on its own
//! database and nothing else. Service isolation is a hard invariant: no call
//! in this module can grant a role on any database other than the one the
//! handle points at.

use anyhow::{anyhow, Result};
use mongodb::bson::{doc, Document};
use mongodb::sync::Database;
use tracing::info;

use crate::provision::connection::{classify, MongoErrorClass};
use crate::provision::report::UserOutcome;

pub struct CredentialScoper {
    user: String,
    password: String,
}

impl CredentialScoper {
    pub fn new(user: &str, password: &str) -> CredentialScoper {
        CredentialScoper {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    /// Create the service user on this database, scoped to it alone
    ///
    /// Re-runs are tolerated: an existing user is reported as
    /// [`UserOutcome::AlreadyExists`], not as a failure. Note that an
    /// existing user's password is left untouched.
    pub fn ensure_on(&self, db: &Database) -> Result<UserOutcome> {
        let command = create_user_command(&self.user, &self.password, db.name());

        match db.run_command(command, None) {
            Ok(_) => {
                info!(
                    database = db.name(),
                    user = self.user.as_str(),
                    "scoped user created"
                );
                Ok(UserOutcome::Created(self.user.clone()))
            }
            Err(e) if classify(&e) == MongoErrorClass::UserExists => {
                Ok(UserOutcome::AlreadyExists(self.user.clone()))
            }
            Err(e) => Err(anyhow!(
                "Failed to create user {} on {}: {}",
                self.user,
                db.name(),
                e
            )),
        }
    }
}

/// The `createUser` command, granting readWrite on `database` only
fn create_user_command(user: &str, password: &str, database: &str) -> Document {
    doc! {
        "createUser": user,
        "pwd": password,
        "roles": [
            {
                "role": "readWrite",
                "db": database,
            }
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_is_scoped_to_one_database() {
        let command = create_user_command("dev123", "dev123", "booking_db");

        let roles = command.get_array("roles").unwrap();
        assert_eq!(roles.len(), 1);

        let role = roles[0].as_document().unwrap();
        assert_eq!(role.get_str("role").unwrap(), "readWrite");
        assert_eq!(role.get_str("db").unwrap(), "booking_db");
    }

    #[test]
    fn test_command_shape() {
        let command = create_user_command("svc", "secret", "inventory_db");
        assert_eq!(command.get_str("createUser").unwrap(), "svc");
        assert_eq!(command.get_str("pwd").unwrap(), "secret");
        // createUser must lead the document; it names the command itself
        assert_eq!(command.keys().next().map(String::as_str), Some("createUser"));
    }
}
