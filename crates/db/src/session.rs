use async_trait::async_trait;
use tracing::debug;

use crate::{
    DBService,
    models::{
        database::Database,
        role::{Role, RoleAttributes},
    },
    statements::Statement,
};

/// Everything the bootstrap needs from an administrative connection.
///
/// Lookups take plain names and bind them as parameters; only [`Statement`]
/// values are ever executed as SQL text.
#[async_trait]
pub trait AdminSession: Send + Sync {
    async fn role_exists(&self, role: &str) -> Result<bool, sqlx::Error>;

    async fn database_exists(&self, database: &str) -> Result<bool, sqlx::Error>;

    async fn role_attributes(&self, role: &str) -> Result<Option<RoleAttributes>, sqlx::Error>;

    async fn role_is_member_of(&self, role: &str, granted: &str) -> Result<bool, sqlx::Error>;

    async fn database_owner(&self, database: &str) -> Result<Option<String>, sqlx::Error>;

    async fn has_connect_privilege(
        &self,
        role: &str,
        database: &str,
    ) -> Result<bool, sqlx::Error>;

    async fn execute(&self, statement: &Statement) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl AdminSession for DBService {
    async fn role_exists(&self, role: &str) -> Result<bool, sqlx::Error> {
        Role::exists(&self.pool, role).await
    }

    async fn database_exists(&self, database: &str) -> Result<bool, sqlx::Error> {
        Database::exists(&self.pool, database).await
    }

    async fn role_attributes(
        &self,
        role: &str,
    ) -> Result<Option<RoleAttributes>, sqlx::Error> {
        Role::find_attributes(&self.pool, role).await
    }

    async fn role_is_member_of(
        &self,
        role: &str,
        granted: &str,
    ) -> Result<bool, sqlx::Error> {
        Role::is_member_of(&self.pool, role, granted).await
    }

    async fn database_owner(&self, database: &str) -> Result<Option<String>, sqlx::Error> {
        Database::find_owner(&self.pool, database).await
    }

    async fn has_connect_privilege(
        &self,
        role: &str,
        database: &str,
    ) -> Result<bool, sqlx::Error> {
        Database::has_connect_privilege(&self.pool, role, database).await
    }

    async fn execute(&self, statement: &Statement) -> Result<(), sqlx::Error> {
        debug!(kind = statement.kind(), "Executing bootstrap statement");
        let sql = statement.to_sql();
        // DDL carries the password inline; keep it out of the prepared statement cache.
        sqlx::query(&sql)
            .persistent(false)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
