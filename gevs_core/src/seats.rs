use std::collections::HashMap;

use log::{debug, info};

use crate::config::{Outcome, Party, PartyTieBreak, SeatCount};
use crate::tally::ConstituencyResult;

/// Converts constituency winners into seat counts, one entry per registered
/// party (in registration order). Parties that won nothing get zero.
pub fn aggregate_seats(parties: &[Party], results: &[ConstituencyResult]) -> Vec<SeatCount> {
    let mut won: HashMap<&str, u32> = HashMap::new();
    for party in results.iter().filter_map(|r| r.winning_party()) {
        *won.entry(party).or_insert(0) += 1;
    }
    let seats: Vec<SeatCount> = parties
        .iter()
        .map(|p| SeatCount {
            party: p.name.clone(),
            seats: won.get(p.name.as_str()).cloned().unwrap_or(0),
        })
        .collect();
    debug!("aggregate_seats: {:?}", seats);
    seats
}

/// The party with the most seats, ties broken by `tiebreak`. `None` if no
/// party won anything.
pub fn leading_party(seats: &[SeatCount], tiebreak: PartyTieBreak) -> Option<&SeatCount> {
    let max_seats = seats.iter().map(|s| s.seats).max().filter(|m| *m > 0)?;
    let mut leaders = seats.iter().filter(|s| s.seats == max_seats);
    match tiebreak {
        PartyTieBreak::RegistrationOrder => leaders.next(),
        PartyTieBreak::Lexicographic => leaders.min_by(|a, b| a.party.cmp(&b.party)),
    }
}

/// Declares a winner if one party holds strictly more than half of all the
/// constituencies, and a hung parliament otherwise.
pub fn resolve_winner(
    total_constituencies: usize,
    seats: &[SeatCount],
    tiebreak: PartyTieBreak,
) -> Outcome {
    let outcome = match leading_party(seats, tiebreak) {
        Some(leader) if 2 * (leader.seats as usize) > total_constituencies => {
            Outcome::Majority(leader.party.clone())
        }
        _ => Outcome::HungParliament,
    };
    info!(
        "resolve_winner: {} constituencies, outcome: {}",
        total_constituencies, outcome
    );
    outcome
}
