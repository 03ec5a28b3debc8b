//! The interaction pipeline behind `POST /interact`.
//!
//! Resolves the visitor, applies an inline command or the promotion step,
//! composes the reply and attaches best-effort audio. The identity step of
//! requests for the same visitor runs one at a time.

use std::sync::Arc;

use tracing::{debug, info};

use super::command::{self, Command};
use super::composer::{Reply, ResponseComposer};
use super::identity::{ContactOutcome, IdentityStore, Member, StoreResult, VisitorId, VoiceId};
use super::locks::KeyedLocks;
use super::promotion::PromotionPolicy;
use super::speech::SpeechSynthesizer;

/// Reply text plus the URL of its rendering (empty when no audio was produced).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionOutcome {
    pub message: String,
    pub audio_url: String,
}

pub struct InteractionHandler {
    store: Arc<dyn IdentityStore>,
    policy: PromotionPolicy,
    composer: ResponseComposer,
    speech: SpeechSynthesizer,
    default_voice: VoiceId,
    locks: KeyedLocks<VisitorId>,
}

impl InteractionHandler {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        policy: PromotionPolicy,
        composer: ResponseComposer,
        speech: SpeechSynthesizer,
        default_voice: VoiceId,
    ) -> Self {
        Self {
            store,
            policy,
            composer,
            speech,
            default_voice,
            locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn IdentityStore> {
        &self.store
    }

    pub fn speech(&self) -> &SpeechSynthesizer {
        &self.speech
    }

    pub fn policy(&self) -> PromotionPolicy {
        self.policy
    }

    pub fn default_voice(&self) -> VoiceId {
        self.default_voice
    }

    /// Handle one message from `visitor_id`.
    ///
    /// Only identity store failures are returned as errors; speech problems
    /// degrade to an empty `audio_url`. The per-visitor lock covers the
    /// identity step only, synthesis runs after it is released.
    pub async fn handle(
        &self,
        visitor_id: VisitorId,
        display_name: &str,
        message: &str,
    ) -> StoreResult<InteractionOutcome> {
        let (text, voice) = {
            let _guard = self.locks.acquire(visitor_id).await;
            match self.store.find_member(visitor_id).await? {
                Some(member) => self.handle_member(member, message).await?,
                None => self.handle_guest(visitor_id, display_name).await?,
            }
        };

        let audio_url = self.speech.render(&text, voice).await.unwrap_or_default();

        Ok(InteractionOutcome {
            message: text,
            audio_url,
        })
    }

    async fn handle_member(
        &self,
        mut member: Member,
        message: &str,
    ) -> StoreResult<(String, VoiceId)> {
        let Some(parsed) = command::parse(message) else {
            return Ok(self.member_greeting(&member));
        };

        match parsed {
            Ok(Command::SetVoice(voice)) => {
                member.voice_id = voice;
                self.store.update_member(&member).await?;
                info!(visitor_id = %member.visitor_id, voice = %voice, "Member voice changed");
                Ok((self.composer.compose(Reply::VoiceChanged(voice)), voice))
            }
            Err(e) => {
                debug!(visitor_id = %member.visitor_id, error = %e, "Command rejected");
                Ok((
                    self.composer.compose(Reply::CommandRejected(e)),
                    member.voice_id,
                ))
            }
        }
    }

    fn member_greeting(&self, member: &Member) -> (String, VoiceId) {
        let text = self.composer.compose(Reply::MemberGreeting {
            name: &member.display_name,
        });
        (text, member.voice_id)
    }

    async fn handle_guest(
        &self,
        visitor_id: VisitorId,
        display_name: &str,
    ) -> StoreResult<(String, VoiceId)> {
        let contact = self
            .store
            .record_guest_contact(visitor_id, display_name, self.policy, self.default_voice)
            .await?;

        let reply = match contact {
            ContactOutcome::Pending(pending) => {
                debug!(
                    visitor_id = %visitor_id,
                    interaction_count = pending.interaction_count,
                    "Guest contact recorded"
                );
                let text = self
                    .composer
                    .compose(Reply::GuestGreeting { name: display_name });
                (text, self.default_voice)
            }
            ContactOutcome::Promoted(member) => {
                info!(visitor_id = %visitor_id, "Guest promoted to member");
                let text = self.composer.compose(Reply::Promoted {
                    name: &member.display_name,
                });
                (text, member.voice_id)
            }
            // Promoted by a concurrent request after our lookup.
            ContactOutcome::AlreadyMember(member) => self.member_greeting(&member),
        };
        Ok(reply)
    }
}
