pub use crate::config::*;
use crate::error::*;

/// A builder for provisioning an election.
///
/// Constituencies and parties must be declared before the candidates that
/// reference them.
///
/// ```
/// pub use gevs_core::builder::Builder;
/// # use gevs_core::ElectionError;
///
/// let mut builder = Builder::new()
///     .constituencies(&["Naboo-Vallery".to_string(), "New-Felucia".to_string()])?
///     .parties(&["Blue Party".to_string(), "Red Party".to_string()])?;
///
/// builder.add_candidate("c1", "Anna", "Blue Party", "Naboo-Vallery")?;
/// builder.add_codes(&["HH64FWPE".to_string()])?;
/// let setup = builder.build();
/// assert_eq!(setup.candidates.len(), 1);
///
/// # Ok::<(), ElectionError>(())
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    pub(crate) _setup: ElectionSetup,
}

fn invalid(message: String) -> ElectionError {
    InvalidSetupSnafu { message }.build()
}

fn check_unique(kind: &str, existing: &[String], names: &[String]) -> Result<()> {
    for (idx, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(invalid(format!("empty {} name", kind)));
        }
        if existing.contains(name) || names[..idx].contains(name) {
            return Err(invalid(format!("duplicate {} {:?}", kind, name)));
        }
    }
    Ok(())
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn constituencies(mut self, names: &[String]) -> Result<Builder> {
        check_unique("constituency", &self._setup.constituencies, names)?;
        self._setup.constituencies.extend(names.iter().cloned());
        Ok(self)
    }

    /// Adds parties. The order of registration is kept and used for tie-breaks.
    pub fn parties(mut self, names: &[String]) -> Result<Builder> {
        check_unique("party", &self._setup.parties, names)?;
        self._setup.parties.extend(names.iter().cloned());
        Ok(self)
    }

    pub fn add_candidate(
        &mut self,
        id: &str,
        name: &str,
        party: &str,
        constituency: &str,
    ) -> Result<()> {
        if id.is_empty() || name.trim().is_empty() {
            return Err(invalid(format!("candidate {:?} needs an id and a name", id)));
        }
        if self._setup.candidates.iter().any(|c| c.id.0 == id) {
            return Err(invalid(format!("duplicate candidate id {:?}", id)));
        }
        if !self._setup.parties.iter().any(|p| p == party) {
            return Err(invalid(format!(
                "candidate {:?} references unknown party {:?}",
                id, party
            )));
        }
        if !self._setup.constituencies.iter().any(|c| c == constituency) {
            return Err(invalid(format!(
                "candidate {:?} references unknown constituency {:?}",
                id, constituency
            )));
        }
        self._setup.candidates.push(CandidateSpec {
            id: CandidateId(id.to_string()),
            name: name.to_string(),
            party: party.to_string(),
            constituency: constituency.to_string(),
        });
        Ok(())
    }

    /// Adds pre-provisioned one-time voter codes.
    pub fn add_codes(&mut self, codes: &[String]) -> Result<()> {
        check_unique("voter code", &self._setup.codes, codes)?;
        self._setup.codes.extend(codes.iter().cloned());
        Ok(())
    }

    pub fn build(self) -> ElectionSetup {
        self._setup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_duplicates() {
        assert!(Builder::new().constituencies(&names(&["A", "A"])).is_err());
        let b = Builder::new().parties(&names(&["Red"])).unwrap();
        assert!(b.parties(&names(&["Red"])).is_err());
    }

    #[test]
    fn candidate_references_are_checked() {
        let mut b = Builder::new()
            .constituencies(&names(&["A"]))
            .unwrap()
            .parties(&names(&["Red"]))
            .unwrap();
        assert!(b.add_candidate("x", "X", "Blue", "A").is_err());
        assert!(b.add_candidate("x", "X", "Red", "B").is_err());
        b.add_candidate("x", "X", "Red", "A").unwrap();
        assert!(matches!(
            b.add_candidate("x", "Other", "Red", "A"),
            Err(ElectionError::InvalidSetup { .. })
        ));
        let setup = b.build();
        assert_eq!(setup.candidates.len(), 1);
        assert_eq!(setup.candidates[0].party, "Red");
    }

    #[test]
    fn codes_must_be_unique() {
        let mut b = Builder::new();
        b.add_codes(&names(&["K1", "K2"])).unwrap();
        assert!(b.add_codes(&names(&["K2"])).is_err());
        assert!(b.add_codes(&names(&[""])).is_err());
        assert_eq!(b.build().codes, names(&["K1", "K2"]));
    }
}
