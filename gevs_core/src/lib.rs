//! The core of the GEVS online voting system.
//!
//! Voters register with a one-time code and cast a single vote while the
//! election is active. When the election commission closes the election,
//! every constituency is tallied, the winners are turned into party seats and
//! a party is declared the winner if it holds a strict majority of the seats.
//!
//! Persistence and identity are collaborators behind the traits of [`store`].
//! [`memory::MemoryStore`] implements all of them in process.
//!
//! ```
//! use std::sync::Arc;
//! use gevs_core::builder::Builder;
//! use gevs_core::*;
//!
//! let mut builder = Builder::new()
//!     .constituencies(&["New-Felucia".to_string()])?
//!     .parties(&["Blue Party".to_string(), "Red Party".to_string()])?;
//! builder.add_candidate("c1", "Anna", "Blue Party", "New-Felucia")?;
//! builder.add_codes(&["HH64FWPE".to_string()])?;
//!
//! let store = MemoryStore::from_setup(&builder.build())?;
//! let service = ElectionService::new(Arc::new(store), TallyRules::DEFAULT_RULES);
//! let voter = service.register_voter(&Registration {
//!     email: "anna@example.com".to_string(),
//!     password: "secret123".to_string(),
//!     full_name: "Anna Example".to_string(),
//!     date_of_birth: "1990-01-31".to_string(),
//!     constituency: "New-Felucia".to_string(),
//!     code: "HH64FWPE".to_string(),
//! })?;
//! service.start_election()?;
//! service.cast_vote(&voter, &CandidateId("c1".to_string()))?;
//! let results = service.end_election()?;
//! assert_eq!(results.winner, Outcome::Majority("Blue Party".to_string()));
//! # Ok::<(), ElectionError>(())
//! ```

mod config;
mod error;

pub mod builder;
pub mod codes;
pub mod lifecycle;
pub mod manual;
pub mod memory;
pub mod recorder;
pub mod seats;
pub mod service;
pub mod store;
pub mod tally;

pub use crate::config::*;
pub use crate::error::{ElectionError, ErrorKind, Result};
pub use crate::memory::MemoryStore;
pub use crate::service::{ElectionEvent, ElectionService};
