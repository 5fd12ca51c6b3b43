use std::sync::PoisonError;

use snafu::Snafu;

use crate::config::{CandidateId, ElectionStatus, VoterId};
use crate::lifecycle::Transition;

/// The four families of failures surfaced to callers.
///
/// None of them leaves a partial write behind.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ErrorKind {
    /// Malformed input. Nothing was changed.
    Validation,
    /// The request is well-formed but the current state forbids it.
    Conflict,
    NotFound,
    /// The underlying persistence failed. The caller may retry.
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ElectionError {
    // Validation
    #[snafu(display("invalid email address {email:?}: {message}"))]
    InvalidEmail { email: String, message: &'static str },
    #[snafu(display("the email {email} is already linked to another account"))]
    EmailInUse { email: String },
    #[snafu(display("password must be at least {min} characters long"))]
    WeakPassword { min: usize },
    #[snafu(display("invalid {field}: {message}"))]
    InvalidField { field: &'static str, message: String },
    #[snafu(display("Invalid UVC. Please check your code."))]
    UnknownCode { code: String },
    #[snafu(display("invalid email or password"))]
    InvalidCredentials,
    #[snafu(display("candidate {candidate} does not stand in constituency {constituency}"))]
    CandidateOutsideConstituency {
        candidate: CandidateId,
        constituency: String,
    },
    #[snafu(display("invalid election setup: {message}"))]
    InvalidSetup { message: String },

    // Conflict
    #[snafu(display("This UVC has already been used."))]
    CodeAlreadyUsed { code: String },
    #[snafu(display("voter {voter} has already voted"))]
    AlreadyVoted { voter: VoterId },
    #[snafu(display("cannot {transition} an election that is {from}"))]
    InvalidTransition {
        from: ElectionStatus,
        transition: Transition,
    },
    #[snafu(display("the election is not active (status: {status})"))]
    ElectionNotActive { status: ElectionStatus },
    #[snafu(display("the election has not ended (status: {status})"))]
    ElectionNotEnded { status: ElectionStatus },

    // Not found
    #[snafu(display("voter {voter} not found"))]
    VoterNotFound { voter: VoterId },
    #[snafu(display("candidate {candidate} not found"))]
    CandidateNotFound { candidate: CandidateId },
    #[snafu(display("constituency {name:?} not found"))]
    ConstituencyNotFound { name: String },
    #[snafu(display("election details not found"))]
    ElectionNotProvisioned,

    // Store
    #[snafu(display("store lock poisoned: {what}"))]
    LockPoisoned { what: &'static str },
    #[snafu(display("store unavailable: {message}"))]
    StoreUnavailable { message: String },
}

impl ElectionError {
    pub fn kind(&self) -> ErrorKind {
        use ElectionError::*;
        match self {
            InvalidEmail { .. }
            | EmailInUse { .. }
            | WeakPassword { .. }
            | InvalidField { .. }
            | UnknownCode { .. }
            | InvalidCredentials
            | CandidateOutsideConstituency { .. }
            | InvalidSetup { .. } => ErrorKind::Validation,
            CodeAlreadyUsed { .. }
            | AlreadyVoted { .. }
            | InvalidTransition { .. }
            | ElectionNotActive { .. }
            | ElectionNotEnded { .. } => ErrorKind::Conflict,
            VoterNotFound { .. }
            | CandidateNotFound { .. }
            | ConstituencyNotFound { .. }
            | ElectionNotProvisioned => ErrorKind::NotFound,
            LockPoisoned { .. } | StoreUnavailable { .. } => ErrorKind::Store,
        }
    }
}

pub type Result<T, E = ElectionError> = std::result::Result<T, E>;

/// Maps a poisoned lock to a store failure.
pub(crate) fn poisoned<G>(what: &'static str) -> impl FnOnce(PoisonError<G>) -> ElectionError {
    move |_| LockPoisonedSnafu { what }.build()
}
