//! Conversion logic between the wire envelope and domain events.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::domain::{Event, EventBody, EventKind, UserId};

use super::websocket::{
    ChallengeSetBody, CodeRanBody, EnvelopeDto, InitialStateBody, RunCodeBody, TimerChangedBody,
    UserJoinedBody, UserLeftBody,
};

/// Envelope decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventDecodeError {
    /// Invalid JSON, or a body that does not match the declared type
    #[error("malformed event: {0}")]
    Malformed(String),

    /// A `type` outside the declared variant set
    #[error("unknown event type {0}")]
    UnknownType(i64),
}

impl From<serde_json::Error> for EventDecodeError {
    fn from(error: serde_json::Error) -> Self {
        EventDecodeError::Malformed(error.to_string())
    }
}

/// Encode an event into its JSON envelope.
pub fn encode_event(event: &Event) -> Result<String, serde_json::Error> {
    let envelope = EnvelopeDto::try_from(event)?;
    serde_json::to_string(&envelope)
}

/// Decode a JSON envelope into an event.
///
/// An unknown `type` is always an error; it never falls back to a default variant.
pub fn decode_event(text: &str) -> Result<Event, EventDecodeError> {
    let envelope: EnvelopeDto = serde_json::from_str(text)?;
    Event::try_from(envelope)
}

// ========================================
// Domain Event → DTO
// ========================================

impl TryFrom<&Event> for EnvelopeDto {
    type Error = serde_json::Error;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        let body = match &event.body {
            EventBody::UserJoined { user } => Some(to_value(UserJoinedBody { user: user.clone() })?),
            EventBody::UserLeft { user_id } => Some(to_value(UserLeftBody { user_id: *user_id })?),
            EventBody::TimerChanged { total, remaining } => Some(to_value(TimerChangedBody {
                total: *total,
                remaining: *remaining,
            })?),
            EventBody::TimerFinished | EventBody::BreakStarted => None,
            EventBody::ChallengeSet { challenge } => Some(to_value(ChallengeSetBody {
                challenge: challenge.clone(),
            })?),
            EventBody::RunCodeRequest { code, lang } => Some(to_value(RunCodeBody {
                code: code.clone(),
                lang: lang.clone(),
            })?),
            EventBody::CodeRanResult { output, passed } => Some(to_value(CodeRanBody {
                output: output.clone(),
                passed: *passed,
            })?),
            EventBody::InitialState {
                challenge,
                users,
                remaining,
                total,
            } => Some(to_value(InitialStateBody {
                current_challenge: challenge.clone(),
                current_users: users.clone(),
                time_remaining: *remaining,
                total_time: *total,
            })?),
        };

        Ok(Self {
            r#type: i64::from(event.kind().code()),
            user_id: event.origin.value(),
            body,
        })
    }
}

fn to_value<T: Serialize>(body: T) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(body)
}

// ========================================
// DTO → Domain Event
// ========================================

impl TryFrom<EnvelopeDto> for Event {
    type Error = EventDecodeError;

    fn try_from(envelope: EnvelopeDto) -> Result<Self, Self::Error> {
        let kind = EventKind::from_code(envelope.r#type)
            .ok_or(EventDecodeError::UnknownType(envelope.r#type))?;

        let body = match kind {
            EventKind::UserJoined => {
                let body: UserJoinedBody = from_body(kind, envelope.body)?;
                EventBody::UserJoined { user: body.user }
            }
            EventKind::UserLeft => {
                let body: UserLeftBody = from_body(kind, envelope.body)?;
                EventBody::UserLeft {
                    user_id: body.user_id,
                }
            }
            EventKind::TimerChanged => {
                let body: TimerChangedBody = from_body(kind, envelope.body)?;
                EventBody::TimerChanged {
                    total: body.total,
                    remaining: body.remaining,
                }
            }
            EventKind::TimerFinished => EventBody::TimerFinished,
            EventKind::ChallengeSet => {
                let body: ChallengeSetBody = from_body(kind, envelope.body)?;
                EventBody::ChallengeSet {
                    challenge: body.challenge,
                }
            }
            EventKind::BreakStarted => EventBody::BreakStarted,
            EventKind::RunCodeRequest => {
                let body: RunCodeBody = from_body(kind, envelope.body)?;
                EventBody::RunCodeRequest {
                    code: body.code,
                    lang: body.lang,
                }
            }
            EventKind::CodeRanResult => {
                let body: CodeRanBody = from_body(kind, envelope.body)?;
                EventBody::CodeRanResult {
                    output: body.output,
                    passed: body.passed,
                }
            }
            EventKind::InitialState => {
                let body: InitialStateBody = from_body(kind, envelope.body)?;
                EventBody::InitialState {
                    challenge: body.current_challenge,
                    users: body.current_users,
                    remaining: body.time_remaining,
                    total: body.total_time,
                }
            }
        };

        Ok(Event::new(UserId::new(envelope.user_id), body))
    }
}

fn from_body<T: DeserializeOwned>(
    kind: EventKind,
    body: Option<serde_json::Value>,
) -> Result<T, EventDecodeError> {
    let body = body
        .ok_or_else(|| EventDecodeError::Malformed(format!("missing body for {:?}", kind)))?;
    Ok(serde_json::from_value(body)?)
}
