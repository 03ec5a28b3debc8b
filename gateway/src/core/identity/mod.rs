//! Visitor identity records and the store contract consumed by the interaction pipeline.
//!
//! Two record kinds exist per visitor identifier:
//! - [`PendingVisitor`] - a guest that is only tracked by how often it has talked to us
//! - [`Member`] - a promoted visitor with a persistent voice profile and memory blob
//!
//! An identifier lives in at most one of the two at any time. Implementations of
//! [`IdentityStore`] must make [`IdentityStore::promote`] a single atomic replace.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryIdentityStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresIdentityStore;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::promotion::PromotionPolicy;

/// Caller-supplied identifier naming one end-user across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(Uuid);

impl VisitorId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for VisitorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for VisitorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Voice profile selecting which synthetic speaker the TTS engine uses.
///
/// No range check is applied here; the engine is the only authority on which
/// ids exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(pub i32);

impl VoiceId {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Guest that has not reached membership yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVisitor {
    pub visitor_id: VisitorId,
    /// Last display name seen for this visitor, overwritten on every call
    pub display_name: String,
    /// Number of contacts so far, 1 after the first message
    pub interaction_count: u32,
}

/// Promoted, remembered visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub visitor_id: VisitorId,
    pub display_name: String,
    pub voice_id: VoiceId,
    /// Conversation memory owned by the reply generator, opaque to this crate
    pub memory: String,
}

/// Memory blob assigned to freshly promoted members.
pub const EMPTY_MEMORY: &str = "[]";

impl Member {
    pub fn new(visitor_id: VisitorId, display_name: impl Into<String>, voice_id: VoiceId) -> Self {
        Self {
            visitor_id,
            display_name: display_name.into(),
            voice_id,
            memory: EMPTY_MEMORY.to_string(),
        }
    }
}

/// Errors raised by identity store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Identity store unavailable: {0}")]
    Unavailable(String),

    #[error("Member not found: {0}")]
    MemberNotFound(VisitorId),

    #[error("Identity store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What recording one guest contact did to the visitor's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Still a guest; the pending record as written
    Pending(PendingVisitor),
    /// This contact reached the threshold and created the member
    Promoted(Member),
    /// The visitor had already been promoted, nothing was written
    AlreadyMember(Member),
}

/// Durable lookup and update of visitor records.
///
/// Every operation is keyed by visitor identifier and atomic on its own.
/// [`IdentityStore::record_guest_contact`] is the read, advance and write of
/// one guest message as a single step, so concurrent contacts for the same
/// visitor (from this process or another one sharing the backend) neither lose
/// an increment nor promote twice.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_member(&self, id: VisitorId) -> StoreResult<Option<Member>>;

    async fn find_pending(&self, id: VisitorId) -> StoreResult<Option<PendingVisitor>>;

    async fn upsert_pending(&self, pending: &PendingVisitor) -> StoreResult<()>;

    /// Replace the pending record (if any) with a new member carrying `voice_id`.
    ///
    /// If a member already exists for `id` it is returned unchanged.
    async fn promote(
        &self,
        id: VisitorId,
        display_name: &str,
        voice_id: VoiceId,
    ) -> StoreResult<Member>;

    /// Persist the display name and voice of an existing member.
    ///
    /// The memory blob is owned by the reply generator and is never written
    /// here. Returns [`StoreError::MemberNotFound`] if the member does not exist.
    async fn update_member(&self, member: &Member) -> StoreResult<()>;

    /// Count one contact from a visitor who was not a member when the request
    /// arrived, promoting with `default_voice` once `policy` says so.
    async fn record_guest_contact(
        &self,
        id: VisitorId,
        display_name: &str,
        policy: PromotionPolicy,
        default_voice: VoiceId,
    ) -> StoreResult<ContactOutcome>;
}
