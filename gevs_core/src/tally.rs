use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::{Candidate, CandidateId};

/// The count of one candidate within a constituency.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateTally {
    pub candidate: CandidateId,
    pub name: String,
    pub party: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub enum ConstituencyOutcome {
    Won {
        candidate: CandidateId,
        party: String,
        votes: u64,
    },
    /// Two or more candidates share the (nonzero) lead. Ties are not broken:
    /// nobody gets the seat.
    Tied {
        votes: u64,
        candidates: Vec<CandidateId>,
    },
    NoVotes,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConstituencyResult {
    pub constituency: String,
    /// In candidate registration order.
    pub tally: Vec<CandidateTally>,
    pub outcome: ConstituencyOutcome,
}

impl ConstituencyResult {
    pub fn winning_party(&self) -> Option<&str> {
        match &self.outcome {
            ConstituencyOutcome::Won { party, .. } => Some(party.as_str()),
            _ => None,
        }
    }
}

/// Finds the leader of one constituency.
pub fn tally_constituency(constituency: &str, candidates: &[&Candidate]) -> ConstituencyResult {
    let tally: Vec<CandidateTally> = candidates
        .iter()
        .map(|c| CandidateTally {
            candidate: c.id.clone(),
            name: c.name.clone(),
            party: c.party.clone(),
            votes: c.votes,
        })
        .collect();

    let max_votes = tally.iter().map(|t| t.votes).max().unwrap_or(0);
    let leaders: Vec<&CandidateTally> = tally.iter().filter(|t| t.votes == max_votes).collect();
    let outcome = match leaders.as_slice() {
        _ if max_votes == 0 => ConstituencyOutcome::NoVotes,
        [single] => ConstituencyOutcome::Won {
            candidate: single.candidate.clone(),
            party: single.party.clone(),
            votes: max_votes,
        },
        _ => ConstituencyOutcome::Tied {
            votes: max_votes,
            candidates: leaders.iter().map(|t| t.candidate.clone()).collect(),
        },
    };
    debug!("tally_constituency: {}: {:?}", constituency, outcome);
    ConstituencyResult {
        constituency: constituency.to_string(),
        tally,
        outcome,
    }
}

/// Tallies every constituency, in the given order.
///
/// Candidates standing in a constituency that is not listed are ignored.
pub fn tally_constituencies(
    constituencies: &[String],
    candidates: &[Candidate],
) -> Vec<ConstituencyResult> {
    for c in candidates.iter() {
        if !constituencies.contains(&c.constituency) {
            warn!(
                "tally_constituencies: candidate {} stands in unknown constituency {}",
                c.id, c.constituency
            );
        }
    }
    constituencies
        .iter()
        .map(|name| {
            let members: Vec<&Candidate> = candidates
                .iter()
                .filter(|c| c.constituency == *name)
                .collect();
            tally_constituency(name, &members)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, party: &str, constituency: &str, votes: u64) -> Candidate {
        Candidate {
            id: CandidateId(id.to_string()),
            name: id.to_uppercase(),
            party: party.to_string(),
            constituency: constituency.to_string(),
            votes,
        }
    }

    #[test]
    fn tie_at_the_top_has_no_winner() {
        let x = cand("x", "Red", "A", 10);
        let y = cand("y", "Blue", "A", 10);
        let r = tally_constituency("A", &[&x, &y]);
        assert_eq!(r.winning_party(), None);
        assert_eq!(
            r.outcome,
            ConstituencyOutcome::Tied {
                votes: 10,
                candidates: vec![x.id.clone(), y.id.clone()]
            }
        );
    }

    #[test]
    fn three_way_tie_has_no_winner() {
        let x = cand("x", "Red", "A", 4);
        let y = cand("y", "Blue", "A", 4);
        let z = cand("z", "Green", "A", 4);
        assert_eq!(tally_constituency("A", &[&x, &y, &z]).winning_party(), None);
    }

    #[test]
    fn clear_leader_wins() {
        let p = cand("p", "Red", "B", 5);
        let q = cand("q", "Blue", "B", 3);
        let r = tally_constituency("B", &[&p, &q]);
        assert_eq!(r.winning_party(), Some("Red"));
        assert_eq!(r.tally.len(), 2);
    }

    #[test]
    fn tie_below_the_leader_does_not_matter() {
        let p = cand("p", "Red", "B", 7);
        let q = cand("q", "Blue", "B", 3);
        let s = cand("s", "Green", "B", 3);
        assert_eq!(tally_constituency("B", &[&p, &q, &s]).winning_party(), Some("Red"));
    }

    #[test]
    fn no_votes_no_winner() {
        let p = cand("p", "Red", "B", 0);
        let q = cand("q", "Blue", "B", 0);
        assert_eq!(
            tally_constituency("B", &[&p, &q]).outcome,
            ConstituencyOutcome::NoVotes
        );
        assert_eq!(tally_constituency("C", &[]).outcome, ConstituencyOutcome::NoVotes);
    }

    #[test]
    fn groups_by_constituency_in_order() {
        let cands = vec![
            cand("x", "Red", "A", 10),
            cand("p", "Red", "B", 5),
            cand("y", "Blue", "A", 10),
            cand("q", "Blue", "B", 3),
            cand("lost", "Blue", "Nowhere", 99),
        ];
        let names = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let results = tally_constituencies(&names, &cands);
        let winners: Vec<Option<&str>> = results.iter().map(|r| r.winning_party()).collect();
        assert_eq!(winners, vec![None, Some("Red"), None]);
        assert_eq!(results[0].tally.len(), 2);
        assert!(results[2].tally.is_empty());
    }
}
