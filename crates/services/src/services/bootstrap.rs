//! Brings the application login role and its template database grants into the
//! desired state. Every step is idempotent, so re-running is the recovery path.

use db::{
    AdminSession,
    models::role::RoleAttributes,
    statements::{SIGNAL_BACKEND_ROLE, Statement},
};
use thiserror::Error;
use tracing::{debug, info};
use utils::{
    events::BootstrapEvent,
    sql::{UnsafeIdentifierError, quote_identifier, quote_literal},
};

use super::config::BootstrapConfig;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    UnsafeIdentifier(#[from] UnsafeIdentifierError),
    #[error("template database {0:?} does not exist")]
    TemplateDatabaseMissing(String),
    #[error("bootstrap is not idempotent: pass {pass} left {second:?}, previous pass left {first:?}")]
    IdempotenceViolation {
        pass: u32,
        first: Box<CatalogSnapshot>,
        second: Box<CatalogSnapshot>,
    },
}

/// Catalog state the bootstrap is responsible for, read back after a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub role: Option<RoleAttributes>,
    pub signal_backend_member: bool,
    pub admin_database_connect: bool,
    pub template_owner: Option<String>,
    pub template_connect: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateOutcome {
    Granted { owner_transferred: bool },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub pass: u32,
    pub role_created: bool,
    pub template: TemplateOutcome,
    pub snapshot: CatalogSnapshot,
}

impl PassOutcome {
    pub fn event(&self, config: &BootstrapConfig) -> BootstrapEvent {
        match self.template {
            TemplateOutcome::Missing => BootstrapEvent::TemplateMissing {
                pass: self.pass,
                target_role: config.target_role.clone(),
                template_db: config.template_database.clone(),
                message: format!(
                    "template database {:?} does not exist, skipping template grants",
                    config.template_database
                ),
            },
            TemplateOutcome::Granted { owner_transferred } => BootstrapEvent::Completed {
                pass: self.pass,
                target_role: config.target_role.clone(),
                template_db: config.template_database.clone(),
                set_template_owner: owner_transferred,
            },
        }
    }
}

/// Run one bootstrap pass.
///
/// Statements run one at a time; the first failure aborts the pass and nothing
/// already applied is rolled back.
pub async fn run_pass<S>(
    session: &S,
    config: &BootstrapConfig,
    pass: u32,
) -> Result<PassOutcome, BootstrapError>
where
    S: AdminSession + ?Sized,
{
    let role = quote_identifier(&config.target_role, "target role")?;
    let admin_database = quote_identifier(&config.admin.database, "admin database")?;
    let template_database = quote_identifier(&config.template_database, "template database")?;
    let signal_backend = quote_identifier(SIGNAL_BACKEND_ROLE, "granted role")?;

    let role_created = if session.role_exists(role.name()).await? {
        debug!(pass, role = role.name(), "Role already exists");
        false
    } else {
        info!(pass, role = role.name(), "Creating login role");
        session
            .execute(&Statement::CreateRole { role: role.clone() })
            .await?;
        true
    };

    session
        .execute(&Statement::AlterRole {
            role: role.clone(),
            password: quote_literal(&config.target_password),
        })
        .await?;
    session
        .execute(&Statement::GrantConnect {
            database: admin_database,
            role: role.clone(),
        })
        .await?;
    session
        .execute(&Statement::GrantRole {
            granted: signal_backend,
            role: role.clone(),
        })
        .await?;

    let template = if session.database_exists(template_database.name()).await? {
        session
            .execute(&Statement::GrantConnect {
                database: template_database.clone(),
                role: role.clone(),
            })
            .await?;
        if config.set_template_owner {
            session
                .execute(&Statement::AlterDatabaseOwner {
                    database: template_database.clone(),
                    owner: role.clone(),
                })
                .await?;
        }
        TemplateOutcome::Granted {
            owner_transferred: config.set_template_owner,
        }
    } else if config.fail_if_template_missing {
        return Err(BootstrapError::TemplateDatabaseMissing(
            config.template_database.clone(),
        ));
    } else {
        info!(
            pass,
            template_db = template_database.name(),
            "Template database missing, skipping template grants"
        );
        TemplateOutcome::Missing
    };

    let snapshot = snapshot(session, config, template).await?;
    Ok(PassOutcome {
        pass,
        role_created,
        template,
        snapshot,
    })
}

async fn snapshot<S>(
    session: &S,
    config: &BootstrapConfig,
    template: TemplateOutcome,
) -> Result<CatalogSnapshot, BootstrapError>
where
    S: AdminSession + ?Sized,
{
    let role = &config.target_role;
    let (template_owner, template_connect) = match template {
        TemplateOutcome::Granted { .. } => (
            session.database_owner(&config.template_database).await?,
            Some(
                session
                    .has_connect_privilege(role, &config.template_database)
                    .await?,
            ),
        ),
        TemplateOutcome::Missing => (None, None),
    };

    Ok(CatalogSnapshot {
        role: session.role_attributes(role).await?,
        signal_backend_member: session.role_is_member_of(role, SIGNAL_BACKEND_ROLE).await?,
        admin_database_connect: session
            .has_connect_privilege(role, &config.admin.database)
            .await?,
        template_owner,
        template_connect,
    })
}

/// Run the bootstrap, twice when `verify_idempotent` is set.
///
/// Each pass reports its event through `on_event` as soon as it finishes. A
/// verification pass must leave the same catalog state as the first one.
pub async fn bootstrap<S, F>(
    session: &S,
    config: &BootstrapConfig,
    mut on_event: F,
) -> Result<Vec<PassOutcome>, BootstrapError>
where
    S: AdminSession + ?Sized,
    F: FnMut(BootstrapEvent),
{
    let passes = if config.verify_idempotent { 2 } else { 1 };
    let mut outcomes: Vec<PassOutcome> = Vec::with_capacity(passes as usize);

    for pass in 1..=passes {
        let outcome = run_pass(session, config, pass).await?;
        on_event(outcome.event(config));

        if let Some(first) = outcomes.first()
            && (first.snapshot != outcome.snapshot || first.template != outcome.template)
        {
            return Err(BootstrapError::IdempotenceViolation {
                pass,
                first: Box::new(first.snapshot.clone()),
                second: Box::new(outcome.snapshot),
            });
        }
        outcomes.push(outcome);
    }

    if passes > 1 {
        on_event(BootstrapEvent::Verified {
            passes,
            target_role: config.target_role.clone(),
        });
    }

    Ok(outcomes)
}
