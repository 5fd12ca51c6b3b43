//! Contracts for the persistence and identity collaborators.
//!
//! Every write here is a conditional update performed by the store. Callers
//! never read a flag and then write it back.

use crate::config::{
    Candidate, CandidateId, ElectionState, OneTimeCode, Party, SeatCount, Voter, VoterId,
};
use crate::error::Result;

/// Outcome of a conditional code consumption.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CodeClaim {
    Consumed,
    AlreadyUsed,
    Unknown,
}

/// Outcome of the single-transaction vote write.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum VoteRecord {
    /// The counter was incremented to `votes` and the voter marked.
    Recorded { votes: u64 },
    AlreadyVoted,
    UnknownVoter,
    UnknownCandidate,
}

pub trait ElectionStore {
    /// `None` when no election has been provisioned.
    fn election(&self) -> Result<Option<ElectionState>>;

    /// Applies `update` to the election record atomically. If `update` fails,
    /// the record is left as it was and the error is returned.
    fn update_election<F>(&self, update: F) -> Result<ElectionState>
    where
        F: FnOnce(&mut ElectionState) -> Result<()>;
}

pub trait CodeStore {
    fn find_code(&self, code: &str) -> Result<Option<OneTimeCode>>;

    /// Flips `used` to true only if it is still false.
    fn consume_code(&self, code: &str) -> Result<CodeClaim>;

    /// Compensates a consumption when the registration could not complete.
    fn release_code(&self, code: &str) -> Result<()>;
}

pub trait VoterStore {
    fn voter(&self, id: &VoterId) -> Result<Option<Voter>>;

    fn insert_voter(&self, voter: Voter) -> Result<()>;

    /// Clears the voting fields of every voter. Returns how many were cleared.
    fn reset_voters(&self) -> Result<usize>;
}

pub trait CandidateStore {
    /// The configured constituencies, in configuration order.
    fn constituencies(&self) -> Result<Vec<String>>;

    fn candidate(&self, id: &CandidateId) -> Result<Option<Candidate>>;

    /// All the candidates with their current counters, in registration order.
    fn candidates(&self) -> Result<Vec<Candidate>>;

    fn reset_vote_counts(&self) -> Result<()>;
}

pub trait PartyStore {
    /// All the parties, in registration order.
    fn parties(&self) -> Result<Vec<Party>>;

    /// Replaces every seat count. Parties absent from `seats` end up with zero.
    fn replace_seats(&self, seats: &[SeatCount]) -> Result<()>;

    fn reset_seats(&self) -> Result<()>;
}

/// The write that turns a ballot into a counted vote.
pub trait VoteLedger {
    /// In one transaction: if the voter has not voted yet, increments the
    /// candidate counter and then marks the voter. A voter is never marked
    /// without the increment having been applied.
    fn record_vote(&self, voter: &VoterId, candidate: &CandidateId) -> Result<VoteRecord>;
}

/// Account storage and credential verification.
pub trait IdentityProvider {
    fn email_exists(&self, email: &str) -> Result<bool>;

    /// Creates an account unless the email is already taken, in which case
    /// `EmailInUse` is returned.
    fn create_account(&self, email: &str, password: &str) -> Result<VoterId>;

    fn delete_account(&self, id: &VoterId) -> Result<()>;

    fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<VoterId>>;
}

/// Everything the election service needs from its environment.
pub trait Store:
    ElectionStore + CodeStore + VoterStore + CandidateStore + PartyStore + VoteLedger + IdentityProvider
{
}

impl<T> Store for T where
    T: ElectionStore
        + CodeStore
        + VoterStore
        + CandidateStore
        + PartyStore
        + VoteLedger
        + IdentityProvider
{
}
