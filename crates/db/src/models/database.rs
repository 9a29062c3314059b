use sqlx::PgPool;

pub struct Database;

impl Database {
    pub async fn exists(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_database WHERE datname = $1)",
        )
        .bind(name)
        .fetch_one(pool)
        .await
    }

    /// Name of the owning role, or `None` when the database does not exist.
    pub async fn find_owner(pool: &PgPool, name: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"SELECT pg_catalog.pg_get_userbyid(datdba)::text
               FROM pg_catalog.pg_database
               WHERE datname = $1"#,
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn has_connect_privilege(
        pool: &PgPool,
        role: &str,
        database: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT pg_catalog.has_database_privilege($1::name, $2::text, 'CONNECT')",
        )
        .bind(role)
        .bind(database)
        .fetch_one(pool)
        .await
    }
}
