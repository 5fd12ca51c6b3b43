// ********* Identifiers ***********

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The identifier of a registered voter, as issued by the identity provider.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct VoterId(pub String);

#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl Display for VoterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ********* Stored records ***********

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub constituency: String,
    /// Only increases while the election is active. Zeroed by an administrative reset.
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    /// Recomputed wholesale by every tally.
    pub seats_won: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    pub id: VoterId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub constituency: String,
    /// The one-time code that backed this registration.
    pub code: String,
    pub has_voted: bool,
    pub voted_for: Option<CandidateId>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub code: String,
    pub used: bool,
}

// ********* Election singleton ***********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionStatus {
    NotStarted,
    Active,
    Ended,
}

impl Display for ElectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ElectionStatus::NotStarted => "not_started",
            ElectionStatus::Active => "active",
            ElectionStatus::Ended => "ended",
        };
        write!(f, "{}", s)
    }
}

/// The declared outcome of the whole election.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// No tally has run since the election was (re)started.
    Pending,
    /// A party holds strictly more than half of the constituencies.
    Majority(String),
    HungParliament,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Pending => write!(f, "Pending"),
            Outcome::Majority(party) => write!(f, "{}", party),
            Outcome::HungParliament => write!(f, "Hung Parliament"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionState {
    pub status: ElectionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub outcome: Outcome,
}

impl Default for ElectionState {
    fn default() -> Self {
        ElectionState {
            status: ElectionStatus::NotStarted,
            start_time: None,
            end_time: None,
            outcome: Outcome::Pending,
        }
    }
}

// ********* Requests and responses **********

/// The fields submitted by a prospective voter.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    pub constituency: String,
    pub code: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub candidate: CandidateId,
    pub candidate_name: String,
    pub constituency: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoterInfo {
    pub constituency: String,
    pub has_voted: bool,
    pub full_name: String,
    pub selected_candidate_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeatCount {
    pub party: String,
    pub seats: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OverallResults {
    pub status: ElectionStatus,
    pub winner: Outcome,
    /// In party registration order.
    pub seats: Vec<SeatCount>,
}

// ********* Configuration **********

/// How to pick the leading party when several hold the same number of seats.
///
/// The pick only matters for display: a tie can never hold a strict majority.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PartyTieBreak {
    /// The party registered first wins the tie.
    RegistrationOrder,
    /// The party whose name sorts first wins the tie.
    Lexicographic,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyRules {
    pub party_tiebreak: PartyTieBreak,
    /// Reject votes for candidates outside of the voter's own constituency.
    /// Off by default: the reference system never checked it.
    pub enforce_constituency_match: bool,
    pub min_password_length: usize,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        party_tiebreak: PartyTieBreak::RegistrationOrder,
        enforce_constituency_match: false,
        min_password_length: 6,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}

/// A candidate as declared at provisioning time.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub id: CandidateId,
    pub name: String,
    pub party: String,
    pub constituency: String,
}

/// Everything a store needs to provision a fresh election.
///
/// Use [`crate::builder::Builder`] to assemble one with validation.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionSetup {
    pub constituencies: Vec<String>,
    pub parties: Vec<String>,
    pub candidates: Vec<CandidateSpec>,
    pub codes: Vec<String>,
}
