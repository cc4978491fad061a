use std::env;
use std::path::PathBuf;

use aclgate_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImporterConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub role_catalog_path: PathBuf,
    pub import_path: PathBuf,
    pub dry_run: bool,
}

impl ImporterConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };

        let database_url = required("DATABASE_URL")?;
        let role_catalog_path = PathBuf::from(required("ROLE_CATALOG_PATH")?);
        let import_path = PathBuf::from(required("ACL_IMPORT_PATH")?);
        let dry_run = match lookup("ACL_IMPORT_DRY_RUN") {
            Some(value) => parse_bool_env("ACL_IMPORT_DRY_RUN", value.as_str())?,
            None => false,
        };

        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.trim().parse::<u32>().map_err(|error| {
                AppError::Validation(format!(
                    "invalid DATABASE_MAX_CONNECTIONS value '{value}': {error}"
                ))
            })?,
            None => 5,
        };
        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            role_catalog_path,
            import_path,
            dry_run,
        })
    }
}

fn parse_bool_env(name: &str, value: &str) -> AppResult<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{value}'"
        )))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
