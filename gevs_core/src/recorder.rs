use log::{debug, info, warn};
use snafu::{ensure, OptionExt};

use crate::config::{CandidateId, TallyRules, VoteReceipt, VoterId};
use crate::error::*;
use crate::store::{Store, VoteRecord};

/// Casts the single vote of a voter.
///
/// The caller must make sure that the election cannot close while this runs.
/// The preliminary reads only produce precise errors: the ledger write is
/// conditional on its own and stays correct under races.
pub fn cast_vote<S: Store>(
    store: &S,
    rules: &TallyRules,
    voter_id: &VoterId,
    candidate_id: &CandidateId,
) -> Result<VoteReceipt> {
    let election = store.election()?.context(ElectionNotProvisionedSnafu)?;
    ensure!(
        election.is_active(),
        ElectionNotActiveSnafu {
            status: election.status
        }
    );
    let voter = store
        .voter(voter_id)?
        .context(VoterNotFoundSnafu { voter: voter_id.clone() })?;
    ensure!(
        !voter.has_voted,
        AlreadyVotedSnafu { voter: voter_id.clone() }
    );
    let candidate = store.candidate(candidate_id)?.context(CandidateNotFoundSnafu {
        candidate: candidate_id.clone(),
    })?;
    if rules.enforce_constituency_match && candidate.constituency != voter.constituency {
        warn!(
            "cast_vote: voter {} from {} picked {} from {}",
            voter_id, voter.constituency, candidate_id, candidate.constituency
        );
        return CandidateOutsideConstituencySnafu {
            candidate: candidate_id.clone(),
            constituency: voter.constituency,
        }
        .fail();
    }

    match store.record_vote(voter_id, candidate_id)? {
        VoteRecord::Recorded { votes } => {
            debug!("cast_vote: {} now has {} votes", candidate_id, votes);
            info!("vote recorded in {}", candidate.constituency);
            Ok(VoteReceipt {
                candidate: candidate.id,
                candidate_name: candidate.name,
                constituency: candidate.constituency,
            })
        }
        VoteRecord::AlreadyVoted => AlreadyVotedSnafu { voter: voter_id.clone() }.fail(),
        VoteRecord::UnknownVoter => VoterNotFoundSnafu { voter: voter_id.clone() }.fail(),
        VoteRecord::UnknownCandidate => CandidateNotFoundSnafu {
            candidate: candidate_id.clone(),
        }
        .fail(),
    }
}
