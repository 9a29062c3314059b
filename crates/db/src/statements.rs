//! DDL/DCL issued by the bootstrap.
//!
//! Every statement is built from [`QuotedIdentifier`] and [`QuotedLiteral`] values,
//! so nothing reaches the SQL text without going through `utils::sql`.

use std::fmt;

use utils::sql::{QuotedIdentifier, QuotedLiteral};

/// Built-in role that lets the application cancel and terminate its own backends.
pub const SIGNAL_BACKEND_ROLE: &str = "pg_signal_backend";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    CreateRole {
        role: QuotedIdentifier,
    },
    AlterRole {
        role: QuotedIdentifier,
        password: QuotedLiteral,
    },
    GrantConnect {
        database: QuotedIdentifier,
        role: QuotedIdentifier,
    },
    GrantRole {
        granted: QuotedIdentifier,
        role: QuotedIdentifier,
    },
    AlterDatabaseOwner {
        database: QuotedIdentifier,
        owner: QuotedIdentifier,
    },
}

impl Statement {
    /// Short label for logs. Never contains the password.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateRole { .. } => "create_role",
            Self::AlterRole { .. } => "alter_role",
            Self::GrantConnect { .. } => "grant_connect",
            Self::GrantRole { .. } => "grant_role",
            Self::AlterDatabaseOwner { .. } => "alter_database_owner",
        }
    }

    pub fn to_sql(&self) -> String {
        match self {
            Self::CreateRole { role } => format!("CREATE ROLE {role} LOGIN;"),
            Self::AlterRole { role, password } => format!(
                "ALTER ROLE {role} WITH LOGIN NOSUPERUSER CREATEDB CREATEROLE NOBYPASSRLS INHERIT PASSWORD {password};"
            ),
            Self::GrantConnect { database, role } => {
                format!("GRANT CONNECT ON DATABASE {database} TO {role};")
            }
            // Built-in role names are lower case, so quoting does not change them.
            Self::GrantRole { granted, role } => format!("GRANT {granted} TO {role};"),
            Self::AlterDatabaseOwner { database, owner } => {
                format!("ALTER DATABASE {database} OWNER TO {owner};")
            }
        }
    }
}

impl fmt::Display for Statement {
    /// Renders without secrets, for error messages and logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlterRole { role, .. } => write!(
                f,
                "ALTER ROLE {role} WITH LOGIN NOSUPERUSER CREATEDB CREATEROLE NOBYPASSRLS INHERIT PASSWORD '***';"
            ),
            other => f.write_str(&other.to_sql()),
        }
    }
}

#[cfg(test)]
mod tests {
    use utils::sql::{quote_identifier, quote_literal};

    use super::*;

    fn ident(value: &str) -> QuotedIdentifier {
        quote_identifier(value, "test").unwrap()
    }

    #[test]
    fn test_create_role_sql() {
        let stmt = Statement::CreateRole { role: ident("medusa") };
        assert_eq!(stmt.to_sql(), r#"CREATE ROLE "medusa" LOGIN;"#);
    }

    #[test]
    fn test_alter_role_sql_escapes_password() {
        let stmt = Statement::AlterRole {
            role: ident("medusa"),
            password: quote_literal("it's"),
        };
        assert_eq!(
            stmt.to_sql(),
            r#"ALTER ROLE "medusa" WITH LOGIN NOSUPERUSER CREATEDB CREATEROLE NOBYPASSRLS INHERIT PASSWORD 'it''s';"#
        );
        assert!(!stmt.to_string().contains("it''s"));
        assert!(!format!("{stmt:?}").contains("it''s"));
    }

    #[test]
    fn test_grant_sql() {
        let connect = Statement::GrantConnect {
            database: ident("postgres"),
            role: ident("medusa"),
        };
        assert_eq!(
            connect.to_sql(),
            r#"GRANT CONNECT ON DATABASE "postgres" TO "medusa";"#
        );

        let signal = Statement::GrantRole {
            granted: ident(SIGNAL_BACKEND_ROLE),
            role: ident("medusa"),
        };
        assert_eq!(signal.to_sql(), r#"GRANT "pg_signal_backend" TO "medusa";"#);
    }

    #[test]
    fn test_alter_database_owner_sql() {
        let stmt = Statement::AlterDatabaseOwner {
            database: ident("template_medusa"),
            owner: ident("medusa"),
        };
        assert_eq!(
            stmt.to_sql(),
            r#"ALTER DATABASE "template_medusa" OWNER TO "medusa";"#
        );
        assert_eq!(stmt.kind(), "alter_database_owner");
    }
}
