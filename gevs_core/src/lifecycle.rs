//! The election lifecycle: `NotStarted -> Active -> Ended`.
//!
//! Transitions are methods on the election record itself. A refused transition
//! leaves the record untouched.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::info;

use crate::config::{ElectionState, ElectionStatus, Outcome};
use snafu::ensure;

use crate::error::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Transition {
    Start,
    End,
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Start => write!(f, "start"),
            Transition::End => write!(f, "end"),
        }
    }
}

impl ElectionState {
    /// Opens the polls. Any previously declared outcome goes back to pending.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            ElectionStatus::NotStarted => {
                self.status = ElectionStatus::Active;
                self.start_time = Some(now);
                self.end_time = None;
                self.outcome = Outcome::Pending;
                info!("election started at {}", now);
                Ok(())
            }
            from => InvalidTransitionSnafu {
                from,
                transition: Transition::Start,
            }
            .fail(),
        }
    }

    /// Closes the polls. The tally runs afterwards, on the closed election.
    pub fn end(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            ElectionStatus::Active => {
                self.status = ElectionStatus::Ended;
                self.end_time = Some(now);
                info!("election ended at {}", now);
                Ok(())
            }
            from => InvalidTransitionSnafu {
                from,
                transition: Transition::End,
            }
            .fail(),
        }
    }

    /// Records the outcome of a tally. Only a closed election can be declared.
    pub fn declare(&mut self, outcome: Outcome) -> Result<()> {
        ensure!(
            self.status == ElectionStatus::Ended,
            ElectionNotEndedSnafu {
                status: self.status
            }
        );
        self.outcome = outcome;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.status == ElectionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn full_lifecycle() {
        let mut e = ElectionState::default();
        e.start(at(7)).unwrap();
        assert_eq!(e.status, ElectionStatus::Active);
        assert_eq!(e.start_time, Some(at(7)));
        assert_eq!(e.outcome, Outcome::Pending);
        e.end(at(22)).unwrap();
        assert_eq!(e.status, ElectionStatus::Ended);
        assert_eq!(e.end_time, Some(at(22)));
        e.declare(Outcome::HungParliament).unwrap();
        assert_eq!(e.outcome, Outcome::HungParliament);
    }

    #[test]
    fn start_twice_is_refused() {
        let mut e = ElectionState::default();
        e.start(at(7)).unwrap();
        let err = e.start(at(8)).unwrap_err();
        assert_eq!(
            err,
            ElectionError::InvalidTransition {
                from: ElectionStatus::Active,
                transition: Transition::Start
            }
        );
        assert_eq!(e.status, ElectionStatus::Active);
        assert_eq!(e.start_time, Some(at(7)));
    }

    #[test]
    fn cannot_end_before_start() {
        let mut e = ElectionState::default();
        let before = e.clone();
        assert!(e.end(at(9)).is_err());
        assert_eq!(e, before);
    }

    #[test]
    fn cannot_reopen_ended_election() {
        let mut e = ElectionState::default();
        e.start(at(7)).unwrap();
        e.end(at(22)).unwrap();
        let before = e.clone();
        assert!(matches!(
            e.start(at(23)),
            Err(ElectionError::InvalidTransition {
                from: ElectionStatus::Ended,
                ..
            })
        ));
        assert!(e.end(at(23)).is_err());
        assert_eq!(e, before);
    }

    #[test]
    fn declare_requires_ended() {
        let mut e = ElectionState::default();
        e.start(at(7)).unwrap();
        assert!(matches!(
            e.declare(Outcome::Majority("Red".to_string())),
            Err(ElectionError::ElectionNotEnded { .. })
        ));
        assert_eq!(e.outcome, Outcome::Pending);
    }
}
