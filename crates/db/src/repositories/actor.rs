use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use hrflow_core::domain::actor::{Actor, ActorId, Role};
use hrflow_core::workflow::ports::{ActorDirectory, StoreError};

use super::{parse_enum, RepositoryError};
use crate::DbPool;

#[derive(Clone)]
pub struct SqlActorDirectory {
    pool: DbPool,
}

impl SqlActorDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, actor: &Actor) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO actor (id, display_name, role, reports_to, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 display_name = excluded.display_name,
                 role = excluded.role,
                 reports_to = excluded.reports_to,
                 active = excluded.active,
                 updated_at = excluded.updated_at",
        )
        .bind(&actor.id.0)
        .bind(&actor.display_name)
        .bind(actor.role.as_str())
        .bind(actor.reports_to.as_ref().map(|id| id.0.as_str()))
        .bind(actor.active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Actor>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, display_name, role, reports_to, active FROM actor ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_actor).collect()
    }
}

fn row_to_actor(row: &SqliteRow) -> Result<Actor, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());
    let role: String = row.try_get("role").map_err(decode)?;
    let reports_to: Option<String> = row.try_get("reports_to").map_err(decode)?;

    Ok(Actor {
        id: ActorId(row.try_get("id").map_err(decode)?),
        display_name: row.try_get("display_name").map_err(decode)?,
        role: parse_enum("role", &role, Role::parse)?,
        reports_to: reports_to.map(ActorId),
        active: row.try_get("active").map_err(decode)?,
    })
}

#[async_trait]
impl ActorDirectory for SqlActorDirectory {
    async fn find_actor(&self, id: &ActorId) -> Result<Option<Actor>, StoreError> {
        let row = sqlx::query(
            "SELECT id, display_name, role, reports_to, active FROM actor WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.as_ref().map(row_to_actor).transpose()?)
    }

    async fn list_by_role(&self, role: Role) -> Result<Vec<Actor>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, display_name, role, reports_to, active
             FROM actor
             WHERE role = ? AND active = 1
             ORDER BY id ASC",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.iter().map(row_to_actor).collect::<Result<Vec<_>, _>>()?)
    }
}
