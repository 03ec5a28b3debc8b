//! Reply text composition.
//!
//! Replies are picked from a fixed template table and interpolated with the
//! visitor's display name or the requested voice id. Placeholders are `{name}`
//! and `{voice_id}`.

use serde::Deserialize;

use crate::core::command::CommandError;
use crate::core::identity::VoiceId;

/// Template table used to render replies.
///
/// Deserializes from the `messages` YAML section; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageTemplates {
    pub member_greeting: String,
    pub guest_greeting: String,
    pub promotion_welcome: String,
    pub command_not_understood: String,
    pub voice_changed: String,
    pub voice_not_numeric: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            member_greeting: "(AI response) Hello, {name}!".to_string(),
            guest_greeting: "(AI response) Hello, {name}.".to_string(),
            promotion_welcome: "Thank you for talking with me so often, {name}! I'm delighted. Starting today I'll remember our conversations.".to_string(),
            command_not_understood: "Sorry, I don't understand that command.".to_string(),
            voice_changed: "Understood — I'll switch my voice to ID {voice_id}.".to_string(),
            voice_not_numeric: "Please specify the ID as a number.".to_string(),
        }
    }
}

/// What the reply has to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply<'a> {
    MemberGreeting { name: &'a str },
    GuestGreeting { name: &'a str },
    Promoted { name: &'a str },
    VoiceChanged(VoiceId),
    CommandRejected(CommandError),
}

#[derive(Debug, Clone, Default)]
pub struct ResponseComposer {
    templates: MessageTemplates,
}

impl ResponseComposer {
    pub fn new(templates: MessageTemplates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &MessageTemplates {
        &self.templates
    }

    pub fn compose(&self, reply: Reply<'_>) -> String {
        let t = &self.templates;
        match reply {
            Reply::MemberGreeting { name } => t.member_greeting.replace("{name}", name),
            Reply::GuestGreeting { name } => t.guest_greeting.replace("{name}", name),
            Reply::Promoted { name } => t.promotion_welcome.replace("{name}", name),
            Reply::VoiceChanged(voice) => t.voice_changed.replace("{voice_id}", &voice.to_string()),
            Reply::CommandRejected(CommandError::NotUnderstood) => {
                t.command_not_understood.clone()
            }
            Reply::CommandRejected(CommandError::NonNumericArgument) => {
                t.voice_not_numeric.clone()
            }
        }
    }
}
