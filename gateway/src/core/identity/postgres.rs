//! PostgreSQL-backed identity store.
//!
//! Uses runtime-checked queries (`sqlx::query`, not `sqlx::query!`) so the crate
//! builds without a live database. The schema is provisioned out of band:
//!
//! ```sql
//! CREATE TABLE pending_visitors (
//!     user_id           UUID PRIMARY KEY,
//!     user_name         TEXT,
//!     interaction_count INTEGER NOT NULL DEFAULT 1
//! );
//!
//! CREATE TABLE members (
//!     user_id           UUID PRIMARY KEY,
//!     user_name         TEXT,
//!     voice_id          INTEGER NOT NULL,
//!     chat_history_json TEXT NOT NULL DEFAULT '[]'
//! );
//! ```
//!
//! Writes for a visitor run in a transaction holding `pg_advisory_xact_lock`
//! on the visitor id, so gateway instances sharing one database still apply
//! contacts for the same visitor one at a time.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgConnection;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use uuid::Uuid;

use super::{
    ContactOutcome, EMPTY_MEMORY, IdentityStore, Member, PendingVisitor, StoreError, StoreResult,
    VisitorId, VoiceId,
};
use crate::core::promotion::{Effect, PromotionPolicy, VisitorState};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

type MemberRow = (Uuid, String, i32, String);

fn member_from_row((user_id, user_name, voice_id, memory): MemberRow) -> Member {
    Member {
        visitor_id: VisitorId::new(user_id),
        display_name: user_name,
        voice_id: VoiceId(voice_id),
        memory,
    }
}

/// Serialize writers for `id` until the surrounding transaction ends.
async fn lock_visitor(conn: &mut PgConnection, id: VisitorId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn fetch_member(
    conn: &mut PgConnection,
    id: VisitorId,
) -> Result<Option<Member>, sqlx::Error> {
    let row = sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT user_id, COALESCE(user_name, ''), voice_id, chat_history_json
        FROM members
        WHERE user_id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(member_from_row))
}

async fn fetch_pending(
    conn: &mut PgConnection,
    id: VisitorId,
) -> Result<Option<PendingVisitor>, sqlx::Error> {
    let row = sqlx::query_as::<_, (Uuid, String, i32)>(
        r#"
        SELECT user_id, COALESCE(user_name, ''), interaction_count
        FROM pending_visitors
        WHERE user_id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|(user_id, user_name, count)| PendingVisitor {
        visitor_id: VisitorId::new(user_id),
        display_name: user_name,
        interaction_count: u32::try_from(count).unwrap_or(0),
    }))
}

async fn write_pending(
    conn: &mut PgConnection,
    pending: &PendingVisitor,
) -> Result<(), sqlx::Error> {
    let count = i32::try_from(pending.interaction_count).unwrap_or(i32::MAX);

    // No pending row is ever written for a member.
    sqlx::query(
        r#"
        INSERT INTO pending_visitors (user_id, user_name, interaction_count)
        SELECT $1, $2, $3
        WHERE NOT EXISTS (SELECT 1 FROM members WHERE user_id = $1)
        ON CONFLICT (user_id) DO UPDATE
        SET user_name = EXCLUDED.user_name,
            interaction_count = EXCLUDED.interaction_count
        "#,
    )
    .bind(pending.visitor_id.as_uuid())
    .bind(&pending.display_name)
    .bind(count)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn replace_with_member(
    conn: &mut PgConnection,
    id: VisitorId,
    display_name: &str,
    voice_id: VoiceId,
) -> Result<Member, sqlx::Error> {
    sqlx::query("DELETE FROM pending_visitors WHERE user_id = $1")
        .bind(id.as_uuid())
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO members (user_id, user_name, voice_id, chat_history_json)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(id.as_uuid())
    .bind(display_name)
    .bind(voice_id.get())
    .bind(EMPTY_MEMORY)
    .execute(&mut *conn)
    .await?;

    fetch_member(conn, id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
}

/// Identity store persisted in PostgreSQL.
pub struct PostgresIdentityStore {
    pool: PgPool,
}

impl PostgresIdentityStore {
    /// Open a connection pool against `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(database_url)
            .await?;
        info!("Connected to PostgreSQL identity store");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn find_member(&self, id: VisitorId) -> StoreResult<Option<Member>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_member(&mut conn, id).await?)
    }

    async fn find_pending(&self, id: VisitorId) -> StoreResult<Option<PendingVisitor>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_pending(&mut conn, id).await?)
    }

    async fn upsert_pending(&self, pending: &PendingVisitor) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_visitor(&mut tx, pending.visitor_id).await?;
        write_pending(&mut tx, pending).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn promote(
        &self,
        id: VisitorId,
        display_name: &str,
        voice_id: VoiceId,
    ) -> StoreResult<Member> {
        let mut tx = self.pool.begin().await?;
        lock_visitor(&mut tx, id).await?;
        let member = replace_with_member(&mut tx, id, display_name, voice_id).await?;
        tx.commit().await?;
        Ok(member)
    }

    async fn update_member(&self, member: &Member) -> StoreResult<()> {
        // chat_history_json belongs to the reply generator.
        let result = sqlx::query(
            r#"
            UPDATE members
            SET user_name = $2, voice_id = $3
            WHERE user_id = $1
            "#,
        )
        .bind(member.visitor_id.as_uuid())
        .bind(&member.display_name)
        .bind(member.voice_id.get())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MemberNotFound(member.visitor_id));
        }
        Ok(())
    }

    async fn record_guest_contact(
        &self,
        id: VisitorId,
        display_name: &str,
        policy: PromotionPolicy,
        default_voice: VoiceId,
    ) -> StoreResult<ContactOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_visitor(&mut tx, id).await?;

        if let Some(member) = fetch_member(&mut tx, id).await? {
            tx.commit().await?;
            return Ok(ContactOutcome::AlreadyMember(member));
        }

        let count = fetch_pending(&mut tx, id)
            .await?
            .map_or(0, |pending| pending.interaction_count);

        let outcome = match policy.on_contact(VisitorState::Guest { count }).effect {
            Effect::Promote => ContactOutcome::Promoted(
                replace_with_member(&mut tx, id, display_name, default_voice).await?,
            ),
            Effect::PersistPending { interaction_count } => {
                let pending = PendingVisitor {
                    visitor_id: id,
                    display_name: display_name.to_string(),
                    interaction_count,
                };
                write_pending(&mut tx, &pending).await?;
                ContactOutcome::Pending(pending)
            }
            // Only members advance without an effect.
            Effect::None => ContactOutcome::Pending(PendingVisitor {
                visitor_id: id,
                display_name: display_name.to_string(),
                interaction_count: count,
            }),
        };

        tx.commit().await?;
        Ok(outcome)
    }
}
