use clap::Parser;

/// Replays an online election: voter registrations, ballots and the actions of the
/// election commission, then summarizes constituency and party results.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file describing the election: constituencies, parties, candidates,
    /// one-time voter codes and tally rules. See the manual of gevs_core for the format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path, optional) The operations to replay, as a JSON array. Without it,
    /// the summary only describes the freshly provisioned election.
    #[clap(short, long, value_parser)]
    pub script: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON format to the given
    /// location. Setting this option overrides the output directory that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected summary in JSON format. If provided, gevs will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
