use sqlx::{FromRow, PgPool};

/// The attributes of a row in `pg_roles` that the bootstrap asserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct RoleAttributes {
    #[sqlx(rename = "rolcanlogin")]
    pub can_login: bool,
    #[sqlx(rename = "rolsuper")]
    pub superuser: bool,
    #[sqlx(rename = "rolcreatedb")]
    pub create_db: bool,
    #[sqlx(rename = "rolcreaterole")]
    pub create_role: bool,
    #[sqlx(rename = "rolbypassrls")]
    pub bypass_rls: bool,
    #[sqlx(rename = "rolinherit")]
    pub inherit: bool,
}

impl RoleAttributes {
    /// The attribute set `ALTER ROLE ... WITH LOGIN NOSUPERUSER CREATEDB CREATEROLE
    /// NOBYPASSRLS INHERIT` leaves behind.
    pub const APPLICATION: Self = Self {
        can_login: true,
        superuser: false,
        create_db: true,
        create_role: true,
        bypass_rls: false,
        inherit: true,
    };
}

pub struct Role;

impl Role {
    pub async fn exists(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_roles WHERE rolname = $1)",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn find_attributes(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<RoleAttributes>, sqlx::Error> {
        sqlx::query_as::<_, RoleAttributes>(
            r#"SELECT rolcanlogin, rolsuper, rolcreatedb, rolcreaterole, rolbypassrls, rolinherit
               FROM pg_catalog.pg_roles
               WHERE rolname = $1"#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Whether `member` is a direct member of `granted`.
    pub async fn is_member_of(
        pool: &PgPool,
        member: &str,
        granted: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS (
                   SELECT 1
                   FROM pg_catalog.pg_auth_members m
                   JOIN pg_catalog.pg_roles r ON r.oid = m.roleid
                   JOIN pg_catalog.pg_roles u ON u.oid = m.member
                   WHERE r.rolname = $1 AND u.rolname = $2
               )"#,
        )
        .bind(granted)
        .bind(member)
        .fetch_one(pool)
        .await
    }
}
