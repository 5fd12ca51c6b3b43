//! Replays a sequence of voter and commission actions against the service.

use crate::gevs::*;

use gevs_core::store::Store;
use gevs_core::{CandidateId, ElectionService, ErrorKind, Registration};
use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    ValidateCode {
        code: String,
    },
    CheckEmailExists {
        email: String,
    },
    RegisterVoter(Registration),
    /// Logs in with email and password, then votes.
    CastVote {
        email: String,
        password: String,
        candidate: String,
    },
    VoterInfo {
        email: String,
        password: String,
    },
    StartElection,
    EndElection,
    Tally,
    ConstituencyResults {
        constituency: String,
    },
    OverallResults,
    ResetVotes,
    ResetSeats,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ValidateCode { .. } => "validateCode",
            Operation::CheckEmailExists { .. } => "checkEmailExists",
            Operation::RegisterVoter(_) => "registerVoter",
            Operation::CastVote { .. } => "castVote",
            Operation::VoterInfo { .. } => "voterInfo",
            Operation::StartElection => "startElection",
            Operation::EndElection => "endElection",
            Operation::Tally => "tally",
            Operation::ConstituencyResults { .. } => "constituencyResults",
            Operation::OverallResults => "overallResults",
            Operation::ResetVotes => "resetVotes",
            Operation::ResetSeats => "resetSeats",
        }
    }
}

pub fn read_script(path: &str) -> GevsResult<Vec<Operation>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let ops: Vec<Operation> = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    info!("Read {} operations from {}", ops.len(), path);
    Ok(ops)
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Validation => "validation",
        ErrorKind::Conflict => "conflict",
        ErrorKind::NotFound => "notFound",
        ErrorKind::Store => "store",
    }
}

fn apply<S: Store>(service: &ElectionService<S>, op: &Operation) -> gevs_core::Result<JSValue> {
    let js = match op {
        Operation::ValidateCode { code } => {
            let check = service.validate_code(code)?;
            json!({"valid": check.valid, "message": check.message()})
        }
        Operation::CheckEmailExists { email } => {
            let exists = service.email_exists(email)?;
            json!({ "emailExists": exists })
        }
        Operation::RegisterVoter(registration) => {
            let id = service.register_voter(registration)?;
            json!({"voterId": id.0})
        }
        Operation::CastVote {
            email,
            password,
            candidate,
        } => {
            let voter = service.authenticate(email, password)?;
            let receipt = service.cast_vote(&voter, &CandidateId(candidate.clone()))?;
            json!({"candidateName": receipt.candidate_name})
        }
        Operation::VoterInfo { email, password } => {
            let voter = service.authenticate(email, password)?;
            let info = service.voter_info(&voter)?;
            json!({
                "hasVoted": info.has_voted,
                "selectedCandidateName": info.selected_candidate_name,
            })
        }
        Operation::StartElection => {
            let state = service.start_election()?;
            json!({"status": state.status.to_string()})
        }
        Operation::EndElection | Operation::Tally => {
            let results = if *op == Operation::Tally {
                service.tally()?
            } else {
                service.end_election()?
            };
            json!({"status": results.status.to_string(), "winner": results.winner.to_string()})
        }
        Operation::ConstituencyResults { constituency } => {
            let r = service.constituency_results(constituency)?;
            json!({"constituency": r.constituency, "winner": r.winning_party()})
        }
        Operation::OverallResults => {
            let r = service.overall_results()?;
            json!({"status": r.status.to_string(), "winner": r.winner.to_string()})
        }
        Operation::ResetVotes => {
            service.reset_votes()?;
            json!({})
        }
        Operation::ResetSeats => {
            service.reset_seats()?;
            json!({})
        }
    };
    Ok(js)
}

/// Runs every operation in order. A failed operation is recorded and the
/// replay goes on.
pub fn replay<S: Store>(service: &ElectionService<S>, ops: &[Operation]) -> Vec<JSValue> {
    let mut log: Vec<JSValue> = Vec::new();
    for (idx, op) in ops.iter().enumerate() {
        let step = idx + 1;
        let mut entry: JSMap<String, JSValue> = JSMap::new();
        entry.insert("step".to_string(), json!(step));
        entry.insert("op".to_string(), json!(op.name()));
        match apply(service, op) {
            Ok(JSValue::Object(details)) => {
                debug!("step {} {}: ok", step, op.name());
                entry.insert("outcome".to_string(), json!("ok"));
                entry.extend(details);
            }
            Ok(other) => {
                entry.insert("outcome".to_string(), json!("ok"));
                entry.insert("value".to_string(), other);
            }
            Err(e) => {
                info!("step {} {}: {}", step, op.name(), e);
                entry.insert("outcome".to_string(), json!(kind_label(e.kind())));
                entry.insert("message".to_string(), json!(e.to_string()));
            }
        }
        log.push(JSValue::Object(entry));
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_operations() {
        let ops: Vec<Operation> = serde_json::from_value(json!([
            {"op": "validateCode", "code": "HH64FWPE"},
            {"op": "registerVoter", "email": "a@b.org", "password": "secret1",
             "fullName": "A B", "dateOfBirth": "1990-01-01",
             "constituency": "New-Felucia", "code": "HH64FWPE"},
            {"op": "castVote", "email": "a@b.org", "password": "secret1", "candidate": "c1"},
            {"op": "startElection"},
            {"op": "resetSeats"}
        ]))
        .unwrap();
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[3], Operation::StartElection);
        match &ops[1] {
            Operation::RegisterVoter(r) => {
                assert_eq!(r.full_name, "A B");
                assert_eq!(r.date_of_birth, "1990-01-01");
            }
            x => panic!("unexpected {:?}", x),
        }
        let names: Vec<&str> = ops.iter().map(|o| o.name()).collect();
        assert_eq!(
            names,
            vec!["validateCode", "registerVoter", "castVote", "startElection", "resetSeats"]
        );
    }

    #[test]
    fn unknown_operation() {
        let res: Result<Vec<Operation>, _> =
            serde_json::from_value(json!([{"op": "rigElection"}]));
        assert!(res.is_err());
    }

    #[test]
    fn failures_are_logged_and_replay_continues() {
        let service = ElectionService::new(
            Arc::new(MemoryStore::empty()),
            gevs_core::TallyRules::DEFAULT_RULES,
        );
        let log = replay(
            &service,
            &[
                Operation::StartElection,
                Operation::ValidateCode {
                    code: "NOPE".to_string(),
                },
            ],
        );
        assert_eq!(
            log[0],
            json!({"step": 1, "op": "startElection", "outcome": "notFound",
                   "message": "election details not found"})
        );
        assert_eq!(
            log[1],
            json!({"step": 2, "op": "validateCode", "outcome": "ok",
                   "valid": false, "message": "Invalid UVC. Please check your code."})
        );
    }
}
