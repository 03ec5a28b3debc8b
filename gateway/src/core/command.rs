//! Inline member commands.
//!
//! A message is a command if and only if it begins with [`COMMAND_SIGIL`]. The only
//! recognized grammar is `@config voice <integer>`.

use thiserror::Error;

use crate::core::identity::VoiceId;

pub const COMMAND_SIGIL: char = '@';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetVoice(VoiceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command not understood")]
    NotUnderstood,
    #[error("argument must be numeric")]
    NonNumericArgument,
}

/// Parse `message` as a command.
///
/// Returns `None` when the message is not a command at all.
pub fn parse(message: &str) -> Option<Result<Command, CommandError>> {
    let body = message.strip_prefix(COMMAND_SIGIL)?;
    let mut tokens = body.split_whitespace();

    let verb = tokens.next();
    let target = tokens.next();
    let recognized = matches!(
        (verb, target),
        (Some(v), Some(t)) if v.eq_ignore_ascii_case("config") && t.eq_ignore_ascii_case("voice")
    );
    if !recognized {
        return Some(Err(CommandError::NotUnderstood));
    }

    let argument = tokens.next();
    if tokens.next().is_some() {
        return Some(Err(CommandError::NonNumericArgument));
    }

    Some(
        argument
            .and_then(|arg| arg.parse::<i32>().ok())
            .map(|id| Command::SetVoice(VoiceId(id)))
            .ok_or(CommandError::NonNumericArgument),
    )
}
