//! One-time voter codes and voter registration.

use std::fmt::Display;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{Registration, TallyRules, Voter, VoterId};
use snafu::ensure;

use crate::error::*;
use crate::store::{CodeClaim, CodeStore, Store};

/// Why a code was turned down.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CodeRejection {
    Unknown,
    AlreadyUsed,
}

impl Display for CodeRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodeRejection::Unknown => write!(f, "Invalid UVC. Please check your code."),
            CodeRejection::AlreadyUsed => write!(f, "This UVC has already been used."),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CodeCheck {
    pub valid: bool,
    pub reason: Option<CodeRejection>,
}

impl CodeCheck {
    pub fn message(&self) -> String {
        self.reason.map(|r| r.to_string()).unwrap_or_default()
    }
}

/// Checks a code without consuming it. The match is exact.
pub fn validate_code<S: CodeStore>(store: &S, code: &str) -> Result<CodeCheck> {
    let check = match store.find_code(code)? {
        None => CodeCheck {
            valid: false,
            reason: Some(CodeRejection::Unknown),
        },
        Some(c) if c.used => CodeCheck {
            valid: false,
            reason: Some(CodeRejection::AlreadyUsed),
        },
        Some(_) => CodeCheck {
            valid: true,
            reason: None,
        },
    };
    debug!("validate_code: {:?}", check);
    Ok(check)
}

/// Checks the shape of an email address, one rule at a time so that the
/// message points at the first problem.
pub fn check_email(email: &str) -> Result<()> {
    let fail = |message: &'static str| -> Result<()> { InvalidEmailSnafu { email, message }.fail() };
    if email.is_empty() {
        return fail("Email address is required.");
    }
    if !email.contains('@') {
        return fail("Email address must include '@'.");
    }
    if email.starts_with('@') {
        return fail("Please enter part before '@'.");
    }
    let after = email.split('@').nth(1).unwrap_or_default();
    if after.is_empty() {
        return fail("Please enter part after '@'.");
    }
    if !after.contains('.') {
        return fail("Domain must include '.'");
    }
    // local@domain.tld, a single '@' and no whitespace anywhere
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .char_indices()
                    .any(|(idx, c)| c == '.' && idx > 0 && idx + 1 < domain.len())
        }
        None => false,
    };
    if !well_formed {
        return fail("Please enter a valid email address.");
    }
    Ok(())
}

fn check_fields(reg: &Registration, rules: &TallyRules) -> Result<NaiveDate> {
    check_email(&reg.email)?;
    ensure!(
        reg.password.chars().count() >= rules.min_password_length,
        WeakPasswordSnafu {
            min: rules.min_password_length
        }
    );
    ensure!(
        !reg.full_name.trim().is_empty(),
        InvalidFieldSnafu {
            field: "full name",
            message: "is required",
        }
    );
    let dob = match NaiveDate::parse_from_str(&reg.date_of_birth, "%Y-%m-%d") {
        Ok(dob) => dob,
        Err(e) => {
            return InvalidFieldSnafu {
                field: "date of birth",
                message: format!("{:?} is not a YYYY-MM-DD date ({})", reg.date_of_birth, e),
            }
            .fail()
        }
    };
    ensure!(
        dob <= Utc::now().date_naive(),
        InvalidFieldSnafu {
            field: "date of birth",
            message: "is in the future",
        }
    );
    Ok(dob)
}

// Compensation failures are logged: the caller gets the error that started the rollback.
fn release_code<S: Store>(store: &S, code: &str) {
    if let Err(e) = store.release_code(code) {
        warn!("register_voter: could not release code {}: {}", code, e);
    }
}

/// Registers a voter, consuming the one-time code.
///
/// The code is claimed with a conditional write before the account is created,
/// so of two registrations racing on the same code only one goes through. If a
/// later step fails, the earlier writes are undone.
pub fn register_voter<S: Store>(store: &S, rules: &TallyRules, reg: &Registration) -> Result<VoterId> {
    let dob = check_fields(reg, rules)?;
    ensure!(
        store.constituencies()?.contains(&reg.constituency),
        ConstituencyNotFoundSnafu {
            name: &reg.constituency
        }
    );
    ensure!(
        !store.email_exists(&reg.email)?,
        EmailInUseSnafu { email: &reg.email }
    );

    match store.consume_code(&reg.code)? {
        CodeClaim::Consumed => {}
        CodeClaim::Unknown => return UnknownCodeSnafu { code: &reg.code }.fail(),
        CodeClaim::AlreadyUsed => return CodeAlreadyUsedSnafu { code: &reg.code }.fail(),
    }

    let id = match store.create_account(&reg.email, &reg.password) {
        Ok(id) => id,
        Err(e) => {
            warn!("register_voter: account creation failed, releasing code: {}", e);
            release_code(store, &reg.code);
            return Err(e);
        }
    };

    let voter = Voter {
        id: id.clone(),
        full_name: reg.full_name.trim().to_string(),
        date_of_birth: dob,
        constituency: reg.constituency.clone(),
        code: reg.code.clone(),
        has_voted: false,
        voted_for: None,
    };
    if let Err(e) = store.insert_voter(voter) {
        warn!("register_voter: storing voter {} failed, rolling back: {}", id, e);
        if let Err(undo) = store.delete_account(&id) {
            warn!("register_voter: could not delete account {}: {}", id, undo);
        }
        release_code(store, &reg.code);
        return Err(e);
    }
    info!("registered voter {} in {}", id, reg.constituency);
    Ok(id)
}
