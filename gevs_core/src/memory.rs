//! An in-process implementation of all the store contracts.
//!
//! Candidate counters are atomics and every voter record has its own lock, so
//! votes from different voters never wait on each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use log::{debug, warn};

use crate::builder::Builder;
use crate::config::*;
use snafu::{ensure, OptionExt};

use crate::error::*;
use crate::store::*;

#[derive(Debug)]
struct CandidateSlot {
    spec: CandidateSpec,
    votes: AtomicU64,
}

impl CandidateSlot {
    fn snapshot(&self) -> Candidate {
        Candidate {
            id: self.spec.id.clone(),
            name: self.spec.name.clone(),
            party: self.spec.party.clone(),
            constituency: self.spec.constituency.clone(),
            votes: self.votes.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug)]
struct Account {
    id: VoterId,
    digest: String,
}

#[derive(Debug)]
pub struct MemoryStore {
    election: RwLock<Option<ElectionState>>,
    constituencies: Vec<String>,
    candidates: Vec<CandidateSlot>,
    candidate_index: HashMap<CandidateId, usize>,
    parties: RwLock<Vec<Party>>,
    codes: Mutex<HashMap<String, bool>>,
    voters: RwLock<HashMap<VoterId, Mutex<Voter>>>,
    // Keyed by normalized email.
    accounts: RwLock<HashMap<String, Account>>,
    next_account: AtomicU64,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_digest(id: &VoterId, password: &str) -> String {
    sha256::digest(format!("{}:{}", id.0, password))
}

impl MemoryStore {
    /// Provisions a store for a fresh election from a setup.
    ///
    /// The setup is validated again, as its fields are public.
    pub fn from_setup(setup: &ElectionSetup) -> Result<MemoryStore> {
        let mut builder = Builder::new()
            .constituencies(&setup.constituencies)?
            .parties(&setup.parties)?;
        for c in setup.candidates.iter() {
            builder.add_candidate(&c.id.0, &c.name, &c.party, &c.constituency)?;
        }
        builder.add_codes(&setup.codes)?;
        let setup = builder.build();

        let candidates: Vec<CandidateSlot> = setup
            .candidates
            .iter()
            .map(|spec| CandidateSlot {
                spec: spec.clone(),
                votes: AtomicU64::new(0),
            })
            .collect();
        let candidate_index = candidates
            .iter()
            .enumerate()
            .map(|(idx, slot)| (slot.spec.id.clone(), idx))
            .collect();
        debug!(
            "from_setup: {} constituencies, {} parties, {} candidates, {} codes",
            setup.constituencies.len(),
            setup.parties.len(),
            candidates.len(),
            setup.codes.len()
        );
        Ok(MemoryStore {
            election: RwLock::new(Some(ElectionState::default())),
            constituencies: setup.constituencies,
            candidates,
            candidate_index,
            parties: RwLock::new(
                setup
                    .parties
                    .into_iter()
                    .map(|name| Party { name, seats_won: 0 })
                    .collect(),
            ),
            codes: Mutex::new(setup.codes.into_iter().map(|c| (c, false)).collect()),
            voters: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            next_account: AtomicU64::new(0),
        })
    }

    /// A deployment where nothing has been provisioned yet, not even the election.
    pub fn empty() -> MemoryStore {
        MemoryStore {
            election: RwLock::new(None),
            constituencies: Vec::new(),
            candidates: Vec::new(),
            candidate_index: HashMap::new(),
            parties: RwLock::new(Vec::new()),
            codes: Mutex::new(HashMap::new()),
            voters: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            next_account: AtomicU64::new(0),
        }
    }
}

impl ElectionStore for MemoryStore {
    fn election(&self) -> Result<Option<ElectionState>> {
        let e = self.election.read().map_err(poisoned("election"))?;
        Ok(e.clone())
    }

    fn update_election<F>(&self, update: F) -> Result<ElectionState>
    where
        F: FnOnce(&mut ElectionState) -> Result<()>,
    {
        let mut guard = self.election.write().map_err(poisoned("election"))?;
        let current = guard.as_mut().context(ElectionNotProvisionedSnafu)?;
        let mut next = current.clone();
        update(&mut next)?;
        *current = next.clone();
        Ok(next)
    }
}

impl CodeStore for MemoryStore {
    fn find_code(&self, code: &str) -> Result<Option<OneTimeCode>> {
        let codes = self.codes.lock().map_err(poisoned("codes"))?;
        Ok(codes.get(code).map(|used| OneTimeCode {
            code: code.to_string(),
            used: *used,
        }))
    }

    fn consume_code(&self, code: &str) -> Result<CodeClaim> {
        let mut codes = self.codes.lock().map_err(poisoned("codes"))?;
        let claim = match codes.get_mut(code) {
            None => CodeClaim::Unknown,
            Some(used) if *used => CodeClaim::AlreadyUsed,
            Some(used) => {
                *used = true;
                CodeClaim::Consumed
            }
        };
        Ok(claim)
    }

    fn release_code(&self, code: &str) -> Result<()> {
        let mut codes = self.codes.lock().map_err(poisoned("codes"))?;
        if let Some(used) = codes.get_mut(code) {
            *used = false;
        }
        Ok(())
    }
}

impl VoterStore for MemoryStore {
    fn voter(&self, id: &VoterId) -> Result<Option<Voter>> {
        let voters = self.voters.read().map_err(poisoned("voters"))?;
        match voters.get(id) {
            Some(slot) => {
                let v = slot.lock().map_err(poisoned("voter record"))?;
                Ok(Some(v.clone()))
            }
            None => Ok(None),
        }
    }

    fn insert_voter(&self, voter: Voter) -> Result<()> {
        let mut voters = self.voters.write().map_err(poisoned("voters"))?;
        ensure!(
            !voters.contains_key(&voter.id),
            StoreUnavailableSnafu {
                message: format!("voter {} already stored", voter.id),
            }
        );
        voters.insert(voter.id.clone(), Mutex::new(voter));
        Ok(())
    }

    fn reset_voters(&self) -> Result<usize> {
        let voters = self.voters.read().map_err(poisoned("voters"))?;
        let mut cleared = 0;
        for slot in voters.values() {
            let mut v = slot.lock().map_err(poisoned("voter record"))?;
            if v.has_voted {
                cleared += 1;
            }
            v.has_voted = false;
            v.voted_for = None;
        }
        Ok(cleared)
    }
}

impl CandidateStore for MemoryStore {
    fn constituencies(&self) -> Result<Vec<String>> {
        Ok(self.constituencies.clone())
    }

    fn candidate(&self, id: &CandidateId) -> Result<Option<Candidate>> {
        Ok(self
            .candidate_index
            .get(id)
            .map(|idx| self.candidates[*idx].snapshot()))
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self.candidates.iter().map(|s| s.snapshot()).collect())
    }

    fn reset_vote_counts(&self) -> Result<()> {
        for slot in self.candidates.iter() {
            slot.votes.store(0, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl PartyStore for MemoryStore {
    fn parties(&self) -> Result<Vec<Party>> {
        let parties = self.parties.read().map_err(poisoned("parties"))?;
        Ok(parties.clone())
    }

    fn replace_seats(&self, seats: &[SeatCount]) -> Result<()> {
        let mut parties = self.parties.write().map_err(poisoned("parties"))?;
        for sc in seats.iter() {
            if !parties.iter().any(|p| p.name == sc.party) {
                warn!("replace_seats: no party found with the name {}", sc.party);
            }
        }
        for p in parties.iter_mut() {
            p.seats_won = seats
                .iter()
                .find(|sc| sc.party == p.name)
                .map(|sc| sc.seats)
                .unwrap_or(0);
        }
        Ok(())
    }

    fn reset_seats(&self) -> Result<()> {
        let mut parties = self.parties.write().map_err(poisoned("parties"))?;
        for p in parties.iter_mut() {
            p.seats_won = 0;
        }
        Ok(())
    }
}

impl VoteLedger for MemoryStore {
    fn record_vote(&self, voter: &VoterId, candidate: &CandidateId) -> Result<VoteRecord> {
        let voters = self.voters.read().map_err(poisoned("voters"))?;
        let slot = match voters.get(voter) {
            Some(slot) => slot,
            None => return Ok(VoteRecord::UnknownVoter),
        };
        // Held until both writes are done: a racing ballot for the same voter waits here.
        let mut record = slot.lock().map_err(poisoned("voter record"))?;
        if record.has_voted {
            return Ok(VoteRecord::AlreadyVoted);
        }
        let idx = match self.candidate_index.get(candidate) {
            Some(idx) => *idx,
            None => return Ok(VoteRecord::UnknownCandidate),
        };
        let votes = self.candidates[idx].votes.fetch_add(1, Ordering::SeqCst) + 1;
        record.has_voted = true;
        record.voted_for = Some(candidate.clone());
        Ok(VoteRecord::Recorded { votes })
    }
}

impl IdentityProvider for MemoryStore {
    fn email_exists(&self, email: &str) -> Result<bool> {
        let accounts = self.accounts.read().map_err(poisoned("accounts"))?;
        Ok(accounts.contains_key(&normalize_email(email)))
    }

    fn create_account(&self, email: &str, password: &str) -> Result<VoterId> {
        let key = normalize_email(email);
        let mut accounts = self.accounts.write().map_err(poisoned("accounts"))?;
        ensure!(!accounts.contains_key(&key), EmailInUseSnafu { email });
        let n = self.next_account.fetch_add(1, Ordering::SeqCst) + 1;
        let id = VoterId(format!("voter-{:06}", n));
        let digest = password_digest(&id, password);
        accounts.insert(
            key,
            Account {
                id: id.clone(),
                digest,
            },
        );
        Ok(id)
    }

    fn delete_account(&self, id: &VoterId) -> Result<()> {
        let mut accounts = self.accounts.write().map_err(poisoned("accounts"))?;
        accounts.retain(|_, acc| acc.id != *id);
        Ok(())
    }

    fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<VoterId>> {
        let accounts = self.accounts.read().map_err(poisoned("accounts"))?;
        Ok(accounts
            .get(&normalize_email(email))
            .filter(|acc| acc.digest == password_digest(&acc.id, password))
            .map(|acc| acc.id.clone()))
    }
}
