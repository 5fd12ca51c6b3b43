//! The election service: the single entry point used by the outer layers.
//!
//! It owns no data. Everything lives in the injected store; the service adds
//! the ordering between operations (no vote is counted once the polls are
//! closed) and publishes events for live result views.

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use snafu::{ensure, OptionExt};

use crate::codes::{self, CodeCheck};
use crate::config::*;
use crate::error::*;
use crate::recorder;
use crate::seats::{aggregate_seats, resolve_winner};
use crate::store::Store;
use crate::tally::{tally_constituencies, tally_constituency, ConstituencyResult};

/// What subscribers are told about. Votes are reported by constituency only.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ElectionEvent {
    Started { at: DateTime<Utc> },
    VoteCast { constituency: String },
    Ended { at: DateTime<Utc> },
    Tallied { outcome: Outcome },
    VotesReset,
    SeatsReset,
}

pub struct ElectionService<S> {
    store: Arc<S>,
    rules: TallyRules,
    // Shared by ballots, exclusive for closing, tallying and resetting.
    gate: RwLock<()>,
    subscribers: Mutex<Vec<Sender<ElectionEvent>>>,
}

impl<S: Store> ElectionService<S> {
    pub fn new(store: Arc<S>, rules: TallyRules) -> ElectionService<S> {
        ElectionService {
            store,
            rules,
            gate: RwLock::new(()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn rules(&self) -> &TallyRules {
        &self.rules
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Registers a new listener. Listeners that hang up are dropped on the next event.
    pub fn subscribe(&self) -> Receiver<ElectionEvent> {
        let (tx, rx) = channel();
        match self.subscribers.lock() {
            Ok(mut subs) => subs.push(tx),
            Err(_) => warn!("subscribe: subscriber list poisoned, events will not be delivered"),
        }
        rx
    }

    fn publish(&self, event: ElectionEvent) {
        debug!("publish: {:?}", event);
        match self.subscribers.lock() {
            Ok(mut subs) => subs.retain(|tx| tx.send(event.clone()).is_ok()),
            Err(_) => warn!("publish: subscriber list poisoned, dropping {:?}", event),
        }
    }

    // ******** Voters ********

    pub fn validate_code(&self, code: &str) -> Result<CodeCheck> {
        codes::validate_code(self.store.as_ref(), code)
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.store.email_exists(email)
    }

    pub fn register_voter(&self, registration: &Registration) -> Result<VoterId> {
        codes::register_voter(self.store.as_ref(), &self.rules, registration)
    }

    /// Logs a voter in.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<VoterId> {
        self.store
            .verify_credentials(email, password)?
            .context(InvalidCredentialsSnafu)
    }

    pub fn cast_vote(&self, voter: &VoterId, candidate: &CandidateId) -> Result<VoteReceipt> {
        let receipt = {
            let _open = self.gate.read().map_err(poisoned("election gate"))?;
            recorder::cast_vote(self.store.as_ref(), &self.rules, voter, candidate)?
        };
        self.publish(ElectionEvent::VoteCast {
            constituency: receipt.constituency.clone(),
        });
        Ok(receipt)
    }

    pub fn voter_info(&self, voter: &VoterId) -> Result<VoterInfo> {
        let v = self
            .store
            .voter(voter)?
            .context(VoterNotFoundSnafu {
                voter: voter.clone(),
            })?;
        let selected_candidate_name = match (&v.voted_for, v.has_voted) {
            (Some(cid), true) => self.store.candidate(cid)?.map(|c| c.name),
            _ => None,
        };
        Ok(VoterInfo {
            constituency: v.constituency,
            has_voted: v.has_voted,
            full_name: v.full_name,
            selected_candidate_name,
        })
    }

    // ******** Lifecycle ********

    pub fn election_details(&self) -> Result<ElectionState> {
        self.store
            .election()?
            .context(ElectionNotProvisionedSnafu)
    }

    pub fn start_election(&self) -> Result<ElectionState> {
        let state = self.store.update_election(|e| e.start(Utc::now()))?;
        if let Some(at) = state.start_time {
            self.publish(ElectionEvent::Started { at });
        }
        Ok(state)
    }

    /// Closes the polls and runs the tally.
    pub fn end_election(&self) -> Result<OverallResults> {
        let results = {
            let _closed = self.gate.write().map_err(poisoned("election gate"))?;
            let state = self.store.update_election(|e| e.end(Utc::now()))?;
            if let Some(at) = state.end_time {
                self.publish(ElectionEvent::Ended { at });
            }
            self.tally_closed()?
        };
        Ok(results)
    }

    /// Runs the tally again on a closed election, for instance after a store
    /// failure interrupted the one triggered by [`Self::end_election`].
    pub fn tally(&self) -> Result<OverallResults> {
        let _closed = self.gate.write().map_err(poisoned("election gate"))?;
        self.tally_closed()
    }

    // Callers hold the gate exclusively.
    fn tally_closed(&self) -> Result<OverallResults> {
        let election = self.election_details()?;
        ensure!(
            election.status == ElectionStatus::Ended,
            ElectionNotEndedSnafu {
                status: election.status
            }
        );
        let constituencies = self.store.constituencies()?;
        let candidates = self.store.candidates()?;
        let parties = self.store.parties()?;
        info!(
            "Tallying {} constituencies, {} candidates, {} parties",
            constituencies.len(),
            candidates.len(),
            parties.len()
        );

        let results = tally_constituencies(&constituencies, &candidates);
        for r in results.iter() {
            info!(
                "Constituency {}: {}",
                r.constituency,
                r.winning_party().unwrap_or("no winner")
            );
        }
        let seats = aggregate_seats(&parties, &results);
        self.store.replace_seats(&seats)?;
        let outcome = resolve_winner(constituencies.len(), &seats, self.rules.party_tiebreak);
        let state = self.store.update_election(|e| e.declare(outcome.clone()))?;
        self.publish(ElectionEvent::Tallied {
            outcome: state.outcome.clone(),
        });
        Ok(OverallResults {
            status: state.status,
            winner: state.outcome,
            seats,
        })
    }

    // ******** Results ********

    /// Finds a constituency by name. An exact match wins, otherwise the match
    /// ignores case and treats `_` and `-` as the same character.
    fn resolve_constituency(&self, name: &str) -> Result<String> {
        let constituencies = self.store.constituencies()?;
        if let Some(c) = constituencies.iter().find(|c| c.as_str() == name) {
            return Ok(c.clone());
        }
        let wanted = loose_name(name);
        constituencies
            .into_iter()
            .find(|c| loose_name(c) == wanted)
            .context(ConstituencyNotFoundSnafu { name })
    }

    pub fn candidates_in(&self, constituency: &str) -> Result<Vec<Candidate>> {
        let name = self.resolve_constituency(constituency)?;
        Ok(self
            .store
            .candidates()?
            .into_iter()
            .filter(|c| c.constituency == name)
            .collect())
    }

    /// The live counts of one constituency. Readable at any time.
    pub fn constituency_results(&self, constituency: &str) -> Result<ConstituencyResult> {
        let name = self.resolve_constituency(constituency)?;
        let candidates = self.store.candidates()?;
        let members: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.constituency == name)
            .collect();
        Ok(tally_constituency(&name, &members))
    }

    pub fn all_constituency_results(&self) -> Result<Vec<ConstituencyResult>> {
        let constituencies = self.store.constituencies()?;
        let candidates = self.store.candidates()?;
        Ok(tally_constituencies(&constituencies, &candidates))
    }

    /// Status, declared winner and the seats of the latest tally.
    ///
    /// An unprovisioned election reads as not started with nothing declared.
    pub fn overall_results(&self) -> Result<OverallResults> {
        let election = match self.store.election()? {
            Some(e) => e,
            None => {
                debug!("overall_results: no election provisioned");
                ElectionState::default()
            }
        };
        let seats = self
            .store
            .parties()?
            .into_iter()
            .map(|p| SeatCount {
                party: p.name,
                seats: p.seats_won,
            })
            .collect();
        Ok(OverallResults {
            status: election.status,
            winner: election.outcome,
            seats,
        })
    }

    // ******** Administration ********

    /// Zeroes every candidate counter and clears every voter's ballot.
    /// The election status is left alone.
    pub fn reset_votes(&self) -> Result<()> {
        {
            let _closed = self.gate.write().map_err(poisoned("election gate"))?;
            self.store.reset_vote_counts()?;
            let cleared = self.store.reset_voters()?;
            info!("Votes reset, {} ballots cleared", cleared);
        }
        self.publish(ElectionEvent::VotesReset);
        Ok(())
    }

    pub fn reset_seats(&self) -> Result<()> {
        {
            let _closed = self.gate.write().map_err(poisoned("election gate"))?;
            self.store.reset_seats()?;
            info!("Party seats reset");
        }
        self.publish(ElectionEvent::SeatsReset);
        Ok(())
    }
}

fn loose_name(name: &str) -> String {
    name.replace('_', "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::error::ErrorKind;
    use crate::memory::MemoryStore;
    use crate::store::CandidateStore;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn strs(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    /// Three constituencies, two candidates each, and `n` voter codes.
    fn service(n: usize) -> ElectionService<MemoryStore> {
        init();
        let mut b = Builder::new()
            .constituencies(&strs(&["Naboo-Vallery", "New-Felucia", "Shangri-la-Town"]))
            .unwrap()
            .parties(&strs(&["Red Party", "Blue Party", "Green Party"]))
            .unwrap();
        b.add_candidate("a-red", "Ann", "Red Party", "Naboo-Vallery").unwrap();
        b.add_candidate("a-blue", "Ben", "Blue Party", "Naboo-Vallery").unwrap();
        b.add_candidate("b-red", "Cat", "Red Party", "New-Felucia").unwrap();
        b.add_candidate("b-green", "Dan", "Green Party", "New-Felucia").unwrap();
        b.add_candidate("c-blue", "Eve", "Blue Party", "Shangri-la-Town").unwrap();
        b.add_candidate("c-green", "Fay", "Green Party", "Shangri-la-Town").unwrap();
        let codes: Vec<String> = (0..n).map(|i| format!("CODE{:04}", i)).collect();
        b.add_codes(&codes).unwrap();
        let store = MemoryStore::from_setup(&b.build()).unwrap();
        ElectionService::new(Arc::new(store), TallyRules::DEFAULT_RULES)
    }

    fn register(s: &ElectionService<MemoryStore>, i: usize, constituency: &str) -> VoterId {
        s.register_voter(&Registration {
            email: format!("voter{}@example.com", i),
            password: "password".to_string(),
            full_name: format!("Voter {}", i),
            date_of_birth: "1985-03-04".to_string(),
            constituency: constituency.to_string(),
            code: format!("CODE{:04}", i),
        })
        .unwrap()
    }

    /// Registers one voter per ballot and casts it.
    fn vote_all(s: &ElectionService<MemoryStore>, ballots: &[(&str, &str)]) {
        for (i, (constituency, candidate)) in ballots.iter().enumerate() {
            let v = register(s, i, constituency);
            s.cast_vote(&v, &CandidateId(candidate.to_string())).unwrap();
        }
    }

    fn seats_of(r: &OverallResults) -> Vec<(&str, u32)> {
        r.seats.iter().map(|s| (s.party.as_str(), s.seats)).collect()
    }

    #[test]
    fn majority_after_end() {
        let s = service(10);
        s.start_election().unwrap();
        vote_all(
            &s,
            &[
                ("Naboo-Vallery", "a-red"),
                ("Naboo-Vallery", "a-red"),
                ("Naboo-Vallery", "a-blue"),
                ("New-Felucia", "b-red"),
                ("Shangri-la-Town", "c-blue"),
                ("Shangri-la-Town", "c-blue"),
            ],
        );
        let r = s.end_election().unwrap();
        assert_eq!(r.status, ElectionStatus::Ended);
        assert_eq!(r.winner, Outcome::Majority("Red Party".to_string()));
        assert_eq!(
            seats_of(&r),
            vec![("Red Party", 2), ("Blue Party", 1), ("Green Party", 0)]
        );
        assert_eq!(s.overall_results().unwrap(), r);
        assert_eq!(s.election_details().unwrap().outcome.to_string(), "Red Party");
    }

    #[test]
    fn ties_and_empty_constituencies_lead_to_hung_parliament() {
        let s = service(10);
        s.start_election().unwrap();
        vote_all(
            &s,
            &[
                ("Naboo-Vallery", "a-red"),
                ("Naboo-Vallery", "a-blue"),
                ("New-Felucia", "b-green"),
            ],
        );
        let r = s.end_election().unwrap();
        assert_eq!(r.winner, Outcome::HungParliament);
        assert_eq!(r.winner.to_string(), "Hung Parliament");
        assert_eq!(
            seats_of(&r),
            vec![("Red Party", 0), ("Blue Party", 0), ("Green Party", 1)]
        );
        let naboo = s.constituency_results("naboo_vallery").unwrap();
        assert_eq!(naboo.winning_party(), None);
        assert!(naboo.tally.iter().all(|t| t.votes == 1));
    }

    #[test]
    fn lifecycle_is_enforced() {
        let s = service(1);
        assert_eq!(s.end_election().unwrap_err().kind(), ErrorKind::Conflict);
        s.start_election().unwrap();
        assert!(matches!(
            s.start_election(),
            Err(ElectionError::InvalidTransition { .. })
        ));
        assert_eq!(s.election_details().unwrap().status, ElectionStatus::Active);
        assert!(matches!(
            s.tally(),
            Err(ElectionError::ElectionNotEnded { .. })
        ));
        s.end_election().unwrap();
        assert!(s.start_election().is_err());
        assert!(s.end_election().is_err());
        assert_eq!(s.election_details().unwrap().status, ElectionStatus::Ended);
    }

    #[test]
    fn overall_results_are_stable_between_tallies() {
        let s = service(4);
        s.start_election().unwrap();
        let before = s.overall_results().unwrap();
        assert_eq!(before.winner, Outcome::Pending);
        vote_all(&s, &[("New-Felucia", "b-red")]);
        assert_eq!(s.overall_results().unwrap(), before);
        assert_eq!(s.overall_results().unwrap(), s.overall_results().unwrap());
    }

    #[test]
    fn retally_is_a_full_recomputation() {
        let s = service(4);
        s.start_election().unwrap();
        vote_all(&s, &[("New-Felucia", "b-red"), ("Naboo-Vallery", "a-red")]);
        let first = s.end_election().unwrap();
        let again = s.tally().unwrap();
        assert_eq!(first, again);
        s.reset_seats().unwrap();
        assert!(s.overall_results().unwrap().seats.iter().all(|p| p.seats == 0));
        assert_eq!(s.tally().unwrap(), first);
    }

    #[test]
    fn reset_votes_clears_counters_and_ballots() {
        let s = service(2);
        s.start_election().unwrap();
        let v = register(&s, 0, "New-Felucia");
        s.cast_vote(&v, &CandidateId("b-red".to_string())).unwrap();
        assert_eq!(
            s.voter_info(&v).unwrap().selected_candidate_name,
            Some("Cat".to_string())
        );
        s.reset_votes().unwrap();
        assert_eq!(s.election_details().unwrap().status, ElectionStatus::Active);
        assert!(s.store().candidates().unwrap().iter().all(|c| c.votes == 0));
        let info = s.voter_info(&v).unwrap();
        assert!(!info.has_voted);
        assert_eq!(info.selected_candidate_name, None);
    }

    #[test]
    fn login_and_lookups() {
        let s = service(1);
        let v = register(&s, 0, "Shangri-la-Town");
        assert_eq!(s.authenticate("voter0@example.com", "password").unwrap(), v);
        assert_eq!(
            s.authenticate("voter0@example.com", "wrong").unwrap_err(),
            ElectionError::InvalidCredentials
        );
        assert!(s.email_exists("voter0@example.com").unwrap());
        let names: Vec<String> = s
            .candidates_in("SHANGRI-LA-TOWN")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, strs(&["Eve", "Fay"]));
        assert_eq!(
            s.constituency_results("Atlantis").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            s.voter_info(&VoterId("nobody".to_string())).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn constituency_names_with_underscores() {
        init();
        let mut b = Builder::new()
            .constituencies(&strs(&["Old_Town", "Old-Town", "Harbour"]))
            .unwrap()
            .parties(&strs(&["Red Party"]))
            .unwrap();
        b.add_candidate("o1", "Gil", "Red Party", "Old_Town").unwrap();
        b.add_candidate("o2", "Hal", "Red Party", "Old-Town").unwrap();
        let store = MemoryStore::from_setup(&b.build()).unwrap();
        let s = ElectionService::new(Arc::new(store), TallyRules::DEFAULT_RULES);

        assert_eq!(s.constituency_results("Old_Town").unwrap().constituency, "Old_Town");
        assert_eq!(s.constituency_results("Old-Town").unwrap().constituency, "Old-Town");
        let names: Vec<String> = s
            .candidates_in("Old_Town")
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, strs(&["Gil"]));
        assert!(s.constituency_results("old_town").is_ok());
        assert_eq!(s.constituency_results("HARBOUR").unwrap().constituency, "Harbour");
        assert_eq!(
            s.constituency_results("Old Town").unwrap_err(),
            ElectionError::ConstituencyNotFound {
                name: "Old Town".to_string()
            }
        );
    }

    #[test]
    fn unprovisioned_results_are_empty() {
        init();
        let s = ElectionService::new(Arc::new(MemoryStore::empty()), TallyRules::DEFAULT_RULES);
        let r = s.overall_results().unwrap();
        assert_eq!(r.status, ElectionStatus::NotStarted);
        assert_eq!(r.winner, Outcome::Pending);
        assert!(r.seats.is_empty());
        assert_eq!(
            s.start_election().unwrap_err(),
            ElectionError::ElectionNotProvisioned
        );
        assert!(s.all_constituency_results().unwrap().is_empty());
    }

    #[test]
    fn events_are_published() {
        let s = service(1);
        let rx = s.subscribe();
        let dropped = s.subscribe();
        drop(dropped);
        s.start_election().unwrap();
        let v = register(&s, 0, "Naboo-Vallery");
        s.cast_vote(&v, &CandidateId("a-blue".to_string())).unwrap();
        s.end_election().unwrap();
        let events: Vec<ElectionEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], ElectionEvent::Started { .. }));
        assert_eq!(
            events[1],
            ElectionEvent::VoteCast {
                constituency: "Naboo-Vallery".to_string()
            }
        );
        assert!(matches!(events[2], ElectionEvent::Ended { .. }));
        assert_eq!(
            events[3],
            ElectionEvent::Tallied {
                outcome: Outcome::HungParliament
            }
        );
        assert_eq!(s.subscribers.lock().unwrap().len(), 1);
    }

    #[test]
    fn concurrent_votes_and_close() {
        let s = service(120);
        let mut voters = Vec::new();
        for i in 0..120 {
            voters.push(register(&s, i, "New-Felucia"));
        }
        s.start_election().unwrap();
        let accepted = AtomicU64::new(0);
        thread::scope(|scope| {
            for chunk in voters.chunks(30) {
                let s = &s;
                let accepted = &accepted;
                scope.spawn(move || {
                    for v in chunk {
                        // Every voter tries twice: only one ballot can count.
                        for _ in 0..2 {
                            match s.cast_vote(v, &CandidateId("b-green".to_string())) {
                                Ok(_) => {
                                    accepted.fetch_add(1, Ordering::SeqCst);
                                }
                                Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict),
                            }
                        }
                    }
                });
            }
            scope.spawn(|| {
                thread::yield_now();
                s.end_election().unwrap();
            });
        });
        let accepted = accepted.load(Ordering::SeqCst);
        assert!(accepted <= 120);
        let felucia = s.constituency_results("New-Felucia").unwrap();
        let counted: u64 = felucia.tally.iter().map(|t| t.votes).sum();
        assert_eq!(counted, accepted);
        let r = s.overall_results().unwrap();
        let expected = if accepted > 0 { 1 } else { 0 };
        assert_eq!(seats_of(&r)[2], ("Green Party", expected));
    }
}
