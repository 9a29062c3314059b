//! Bootstrap configuration, read from environment variables once per run.

use std::{collections::HashMap, fmt};

use db::{AdminConnectOptions, SslMode, connection::InvalidSslMode};
use thiserror::Error;
use utils::sql::{UnsafeIdentifierError, assert_safe_identifier};

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_ADMIN_DATABASE: &str = "postgres";
pub const DEFAULT_SSL_MODE: SslMode = SslMode::Disable;
pub const DEFAULT_TEMPLATE_DATABASE: &str = "template_medusa";

const ADMIN_HOST: &[&str] = &["BOOTSTRAP_ADMIN_PGHOST", "PGHOST"];
const ADMIN_PORT: &[&str] = &["BOOTSTRAP_ADMIN_PGPORT", "PGPORT"];
const ADMIN_USER: &[&str] = &["BOOTSTRAP_ADMIN_PGUSER"];
const ADMIN_PASSWORD: &[&str] = &["BOOTSTRAP_ADMIN_PGPASSWORD"];
const ADMIN_DATABASE: &[&str] = &["BOOTSTRAP_ADMIN_PGDATABASE", "PGDATABASE"];
const ADMIN_SSL_MODE: &[&str] = &["BOOTSTRAP_ADMIN_PGSSLMODE", "PGSSLMODE"];
const TARGET_ROLE: &[&str] = &["PGUSER"];
const TARGET_PASSWORD: &[&str] = &["PGPASSWORD"];
const TEMPLATE_DATABASE: &[&str] = &["BOOTSTRAP_TEMPLATE_DB", "DB_TEMPLATE_NAME"];
const SET_TEMPLATE_OWNER: &[&str] = &["BOOTSTRAP_SET_TEMPLATE_OWNER"];
const FAIL_IF_TEMPLATE_MISSING: &[&str] = &["BOOTSTRAP_FAIL_IF_TEMPLATE_MISSING"];
const VERIFY_IDEMPOTENT: &[&str] = &["BOOTSTRAP_VERIFY_IDEMPOTENT"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{variable} is required")]
    Missing { variable: String },
    #[error("{variable} must not be blank")]
    Blank { variable: String },
    #[error("{variable} must be an integer between 1 and 65535, got {value:?}")]
    InvalidPort { variable: String, value: String },
    #[error(
        "{variable} must be one of 1, true, yes, on, 0, false, no, off, got {value:?}"
    )]
    InvalidBoolean { variable: String, value: String },
    #[error("{variable}: {source}")]
    InvalidSslMode {
        variable: String,
        source: InvalidSslMode,
    },
    #[error(transparent)]
    UnsafeIdentifier(#[from] UnsafeIdentifierError),
    #[error("PGUSER must differ from BOOTSTRAP_ADMIN_PGUSER, both are {role:?}")]
    TargetIsAdmin { role: String },
}

/// Snapshot of environment variables the loader reads from.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Variables that are not valid unicode are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// First variable of `names` that is set, with its name.
    fn lookup(&self, names: &[&'static str]) -> Option<(&'static str, &str)> {
        names
            .iter()
            .find_map(|name| self.get(name).map(|value| (*name, value)))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub admin: AdminConnectOptions,
    pub target_role: String,
    pub target_password: String,
    pub template_database: String,
    pub set_template_owner: bool,
    pub fail_if_template_missing: bool,
    pub verify_idempotent: bool,
}

impl fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("admin", &self.admin)
            .field("target_role", &self.target_role)
            .field("target_password", &"<redacted>")
            .field("template_database", &self.template_database)
            .field("set_template_owner", &self.set_template_owner)
            .field("fail_if_template_missing", &self.fail_if_template_missing)
            .field("verify_idempotent", &self.verify_idempotent)
            .finish()
    }
}

fn display_names(names: &[&str]) -> String {
    names.join(" or ")
}

fn required(env: &Environment, names: &[&'static str]) -> Result<String, ConfigurationError> {
    match env.lookup(names) {
        None => Err(ConfigurationError::Missing {
            variable: display_names(names),
        }),
        Some((name, value)) if value.trim().is_empty() => Err(ConfigurationError::Blank {
            variable: name.to_string(),
        }),
        Some((_, value)) => Ok(value.trim().to_string()),
    }
}

/// Secrets are used verbatim; surrounding whitespace may be part of them.
fn required_secret(
    env: &Environment,
    names: &[&'static str],
) -> Result<String, ConfigurationError> {
    match env.lookup(names) {
        None => Err(ConfigurationError::Missing {
            variable: display_names(names),
        }),
        Some((name, value)) if value.trim().is_empty() => Err(ConfigurationError::Blank {
            variable: name.to_string(),
        }),
        Some((_, value)) => Ok(value.to_string()),
    }
}

fn optional<'a>(
    env: &'a Environment,
    names: &[&'static str],
) -> Result<Option<(&'static str, &'a str)>, ConfigurationError> {
    match env.lookup(names) {
        None => Ok(None),
        Some((name, value)) if value.trim().is_empty() => Err(ConfigurationError::Blank {
            variable: name.to_string(),
        }),
        Some((name, value)) => Ok(Some((name, value.trim()))),
    }
}

fn optional_string(
    env: &Environment,
    names: &[&'static str],
    default: &str,
) -> Result<(String, String), ConfigurationError> {
    Ok(match optional(env, names)? {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (names[0].to_string(), default.to_string()),
    })
}

fn parse_port(variable: &str, value: &str) -> Result<u16, ConfigurationError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|port| (1..=65535).contains(port))
        .and_then(|port| u16::try_from(port).ok())
        .ok_or_else(|| ConfigurationError::InvalidPort {
            variable: variable.to_string(),
            value: value.to_string(),
        })
}

pub fn parse_bool(variable: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::InvalidBoolean {
            variable: variable.to_string(),
            value: value.to_string(),
        }),
    }
}

fn optional_bool(
    env: &Environment,
    names: &[&'static str],
    default: bool,
) -> Result<bool, ConfigurationError> {
    // Blank is not a recognised token, so it is reported as an invalid boolean.
    match env.lookup(names) {
        None => Ok(default),
        Some((name, value)) => parse_bool(name, value),
    }
}

/// Build and validate the configuration. No network I/O happens here.
pub fn load_config(env: &Environment) -> Result<BootstrapConfig, ConfigurationError> {
    let host = required(env, ADMIN_HOST)?;
    let port = match optional(env, ADMIN_PORT)? {
        Some((name, value)) => parse_port(name, value)?,
        None => DEFAULT_PORT,
    };
    let admin_user = required(env, ADMIN_USER)?;
    let admin_password = required_secret(env, ADMIN_PASSWORD)?;

    let (admin_db_var, admin_database) =
        optional_string(env, ADMIN_DATABASE, DEFAULT_ADMIN_DATABASE)?;
    assert_safe_identifier(&admin_database, &admin_db_var)?;

    let ssl_mode = match optional(env, ADMIN_SSL_MODE)? {
        Some((name, value)) => {
            value
                .parse::<SslMode>()
                .map_err(|source| ConfigurationError::InvalidSslMode {
                    variable: name.to_string(),
                    source,
                })?
        }
        None => DEFAULT_SSL_MODE,
    };

    let target_role = required(env, TARGET_ROLE)?;
    assert_safe_identifier(&target_role, TARGET_ROLE[0])?;
    let target_password = required_secret(env, TARGET_PASSWORD)?;

    let (template_var, template_database) =
        optional_string(env, TEMPLATE_DATABASE, DEFAULT_TEMPLATE_DATABASE)?;
    assert_safe_identifier(&template_database, &template_var)?;

    let set_template_owner = optional_bool(env, SET_TEMPLATE_OWNER, true)?;
    let fail_if_template_missing = optional_bool(env, FAIL_IF_TEMPLATE_MISSING, false)?;
    let verify_idempotent = optional_bool(env, VERIFY_IDEMPOTENT, false)?;

    if target_role == admin_user {
        return Err(ConfigurationError::TargetIsAdmin { role: target_role });
    }

    Ok(BootstrapConfig {
        admin: AdminConnectOptions {
            host,
            port,
            username: admin_user,
            password: admin_password,
            database: admin_database,
            ssl_mode,
        },
        target_role,
        target_password,
        template_database,
        set_template_owner,
        fail_if_template_missing,
        verify_idempotent,
    })
}
