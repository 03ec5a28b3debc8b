//! In-process identity store.
//!
//! Both record kinds share one lock so a promotion can never be observed
//! half-applied.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    ContactOutcome, IdentityStore, Member, PendingVisitor, StoreError, StoreResult, VisitorId,
    VoiceId,
};
use crate::core::promotion::{Effect, PromotionPolicy, VisitorState};

#[derive(Default)]
struct Records {
    members: HashMap<VisitorId, Member>,
    pending: HashMap<VisitorId, PendingVisitor>,
}

impl Records {
    fn upsert_pending(&mut self, pending: &PendingVisitor) {
        if self.members.contains_key(&pending.visitor_id) {
            tracing::warn!(
                visitor_id = %pending.visitor_id,
                "Ignoring pending upsert for an existing member"
            );
            return;
        }
        self.pending.insert(pending.visitor_id, pending.clone());
    }

    fn promote(&mut self, id: VisitorId, display_name: &str, voice_id: VoiceId) -> Member {
        self.pending.remove(&id);
        self.members
            .entry(id)
            .or_insert_with(|| Member::new(id, display_name, voice_id))
            .clone()
    }
}

/// Identity store kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct InMemoryIdentityStore {
    records: RwLock<Records>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn member_count(&self) -> usize {
        self.records.read().members.len()
    }

    pub fn pending_count(&self) -> usize {
        self.records.read().pending.len()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn find_member(&self, id: VisitorId) -> StoreResult<Option<Member>> {
        Ok(self.records.read().members.get(&id).cloned())
    }

    async fn find_pending(&self, id: VisitorId) -> StoreResult<Option<PendingVisitor>> {
        Ok(self.records.read().pending.get(&id).cloned())
    }

    async fn upsert_pending(&self, pending: &PendingVisitor) -> StoreResult<()> {
        self.records.write().upsert_pending(pending);
        Ok(())
    }

    async fn promote(
        &self,
        id: VisitorId,
        display_name: &str,
        voice_id: VoiceId,
    ) -> StoreResult<Member> {
        Ok(self.records.write().promote(id, display_name, voice_id))
    }

    async fn update_member(&self, member: &Member) -> StoreResult<()> {
        let mut records = self.records.write();
        match records.members.get_mut(&member.visitor_id) {
            Some(existing) => {
                existing.display_name = member.display_name.clone();
                existing.voice_id = member.voice_id;
                Ok(())
            }
            None => Err(StoreError::MemberNotFound(member.visitor_id)),
        }
    }

    async fn record_guest_contact(
        &self,
        id: VisitorId,
        display_name: &str,
        policy: PromotionPolicy,
        default_voice: VoiceId,
    ) -> StoreResult<ContactOutcome> {
        let mut records = self.records.write();
        if let Some(member) = records.members.get(&id) {
            return Ok(ContactOutcome::AlreadyMember(member.clone()));
        }

        let count = records
            .pending
            .get(&id)
            .map_or(0, |pending| pending.interaction_count);

        let outcome = match policy.on_contact(VisitorState::Guest { count }).effect {
            Effect::Promote => {
                ContactOutcome::Promoted(records.promote(id, display_name, default_voice))
            }
            Effect::PersistPending { interaction_count } => {
                let pending = PendingVisitor {
                    visitor_id: id,
                    display_name: display_name.to_string(),
                    interaction_count,
                };
                records.upsert_pending(&pending);
                ContactOutcome::Pending(pending)
            }
            // Only members advance without an effect.
            Effect::None => ContactOutcome::Pending(PendingVisitor {
                visitor_id: id,
                display_name: display_name.to_string(),
                interaction_count: count,
            }),
        };
        Ok(outcome)
    }
}
