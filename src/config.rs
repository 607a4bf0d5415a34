use crate::core::{DbError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use uuid::Uuid;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]*$").unwrap();
}

pub const ENV_ENVIRONMENT: &str = "ROWMIRROR_ENV";
pub const ENV_PRIVATE_ID: &str = "ROWMIRROR_PRIVATE_ID";
pub const ENV_DB_DIR: &str = "ROWMIRROR_DB_DIR";
pub const ENV_DEBUG: &str = "ROWMIRROR_DEBUG";

/// Where database files live and how statements are traced.
///
/// The environment tag separates e.g. development data from production
/// data; the private id separates accounts sharing one folder.
#[derive(Debug, Clone, PartialEq)]
pub struct MapperConfig {
    /// Environment tag, part of both database file names
    pub environment: String,

    /// Private database identifier
    pub private_id: String,

    /// Folder holding the database files
    pub database_folder: PathBuf,

    /// Log every statement with its arguments
    pub debug: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            environment: "default".to_string(),
            private_id: "private".to_string(),
            database_folder: PathBuf::from("."),
            debug: false,
        }
    }
}

impl MapperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the environment tag
    pub fn environment(mut self, environment: &str) -> Self {
        self.environment = environment.to_string();
        self
    }

    /// Set the private database identifier
    pub fn private_id(mut self, private_id: &str) -> Self {
        self.private_id = private_id.to_string();
        self
    }

    /// Set the database folder
    pub fn database_folder(mut self, folder: impl AsRef<Path>) -> Self {
        self.database_folder = folder.as_ref().to_path_buf();
        self
    }

    /// Enable statement tracing
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Defaults overridden by `ROWMIRROR_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(environment) = env::var(ENV_ENVIRONMENT) {
            config.environment = environment;
        }
        if let Ok(private_id) = env::var(ENV_PRIVATE_ID) {
            config.private_id = private_id;
        }
        if let Ok(folder) = env::var(ENV_DB_DIR) {
            config.database_folder = PathBuf::from(folder);
        }
        if let Ok(debug) = env::var(ENV_DEBUG) {
            config.debug = matches!(
                debug.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (what, value) in [
            ("environment", &self.environment),
            ("private id", &self.private_id),
        ] {
            if !IDENTIFIER.is_match(value) {
                return Err(DbError::ResolutionError(format!(
                    "invalid {} '{}': use letters, digits, '_', '-' or '.'",
                    what, value
                )));
            }
        }
        Ok(())
    }

    /// File name of the database shared by every account.
    pub fn public_database(&self) -> String {
        format!("{}_public.db", self.environment)
    }

    /// File name of the per-account database, derived from the environment
    /// tag and the private id so the id itself never shows up on disk.
    pub fn private_database(&self) -> String {
        let name = format!("{}{}", self.environment, self.private_id);
        let hashed = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        format!("{}.db", hashed.simple().to_string().to_uppercase())
    }

    pub fn database_path(&self, public: bool) -> PathBuf {
        let file = if public {
            self.public_database()
        } else {
            self.private_database()
        };
        self.database_folder.join(file)
    }
}
