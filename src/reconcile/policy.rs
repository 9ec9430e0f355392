//! Response classification.
//!
//! The server marks errors by ending the message code with `E`. It uses the
//! same error shape when a create finds the object already there or a delete
//! finds nothing to delete, so a small per-operation allow-list maps those
//! codes back to no-ops. Every such code lives in [`NOOP_CODES`].

use super::types::{ApiResponse, Operation, Outcome};

pub const ERROR_SENTINEL: char = 'E';

/// Session already exists.
pub const SESSION_ALREADY_EXISTS: &str = "IWNR1019E";
/// Session does not exist.
pub const SESSION_DOES_NOT_EXIST: &str = "IWNR1024E";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoopKind {
    AlreadySatisfied,
    AlreadyAbsent,
}

impl From<NoopKind> for Outcome {
    fn from(kind: NoopKind) -> Self {
        match kind {
            NoopKind::AlreadySatisfied => Outcome::NoopAlreadySatisfied,
            NoopKind::AlreadyAbsent => Outcome::NoopAlreadyAbsent,
        }
    }
}

/// `(operation, message code) -> no-op` remaps. Anything not listed here is
/// classified by the sentinel alone.
pub const NOOP_CODES: &[(Operation, &str, NoopKind)] = &[
    (Operation::CreateSession, SESSION_ALREADY_EXISTS, NoopKind::AlreadySatisfied),
    (
        Operation::CreateSessionByVolumeGroup,
        SESSION_ALREADY_EXISTS,
        NoopKind::AlreadySatisfied,
    ),
    (Operation::DeleteSession, SESSION_DOES_NOT_EXIST, NoopKind::AlreadyAbsent),
];

pub fn noop_for(operation: Operation, code: &str) -> Option<NoopKind> {
    NOOP_CODES
        .iter()
        .find(|(op, noop_code, _)| *op == operation && *noop_code == code)
        .map(|(_, _, kind)| *kind)
}

pub fn is_error_code(code: &str) -> bool {
    code.ends_with(ERROR_SENTINEL)
}

/// Pure function of the operation and the reply.
pub fn classify(operation: Operation, response: &ApiResponse) -> Outcome {
    let code = response.message_code.as_str();

    if !is_error_code(code) {
        return Outcome::Success;
    }

    match noop_for(operation, code) {
        Some(kind) => kind.into(),
        None => Outcome::Failure {
            message: if response.message_text.is_empty() {
                code.to_string()
            } else {
                response.message_text.clone()
            },
        },
    }
}
