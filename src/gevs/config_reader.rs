use crate::gevs::*;

use gevs_core::builder::Builder;
use gevs_core::{ElectionSetup, PartyTieBreak, TallyRules};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "electionName")]
    pub election_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GevsParty {
    pub name: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GevsCandidate {
    pub id: String,
    pub name: String,
    pub party: String,
    pub constituency: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct GevsRules {
    #[serde(rename = "partyTiebreakMode")]
    pub party_tiebreak_mode: Option<String>,
    #[serde(rename = "enforceConstituencyMatch")]
    pub enforce_constituency_match: Option<bool>,
    #[serde(rename = "minPasswordLength")]
    pub min_password_length: Option<JSValue>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GevsConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub constituencies: Vec<String>,
    pub parties: Vec<GevsParty>,
    pub candidates: Vec<GevsCandidate>,
    #[serde(rename = "voterCodes", default)]
    pub voter_codes: Vec<String>,
    #[serde(default)]
    pub rules: GevsRules,
}

impl GevsConfig {
    /// Checks the election definition and turns it into a setup for the store.
    pub fn setup(&self) -> GevsResult<ElectionSetup> {
        let parties: Vec<String> = self.parties.iter().map(|p| p.name.clone()).collect();
        let mut builder = Builder::new()
            .constituencies(&self.constituencies)
            .context(ElectionSnafu {})?
            .parties(&parties)
            .context(ElectionSnafu {})?;
        for c in self.candidates.iter() {
            builder
                .add_candidate(&c.id, &c.name, &c.party, &c.constituency)
                .context(ElectionSnafu {})?;
        }
        builder
            .add_codes(&self.voter_codes)
            .context(ElectionSnafu {})?;
        Ok(builder.build())
    }

    pub fn tally_rules(&self) -> GevsResult<TallyRules> {
        validate_rules(&self.rules)
    }
}

fn validate_rules(rules: &GevsRules) -> GevsResult<TallyRules> {
    let defaults = TallyRules::DEFAULT_RULES;
    let res = TallyRules {
        party_tiebreak: match rules.party_tiebreak_mode.as_deref() {
            None | Some("registrationOrder") => PartyTieBreak::RegistrationOrder,
            Some("lexicographic") => PartyTieBreak::Lexicographic,
            Some(x) => {
                whatever!("Cannot use party tiebreak mode {:?}", x)
            }
        },
        enforce_constituency_match: rules
            .enforce_constituency_match
            .unwrap_or(defaults.enforce_constituency_match),
        min_password_length: match &rules.min_password_length {
            None => defaults.min_password_length,
            x => read_js_int(x)?,
        },
    };
    Ok(res)
}

pub fn read_config(path: &str) -> GevsResult<GevsConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: GevsConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: String) -> GevsResult<JSValue> {
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

// Numbers may be written as JSON numbers or as strings.
fn read_js_int(x: &Option<JSValue>) -> GevsResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
