use clap::Parser;
use log::{debug, info};
use snafu::ErrorCompat;

mod args;
mod gevs;

fn main() {
    let args = args::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    debug!("args: {:?}", args);

    let res = gevs::run_election(
        args.config.clone(),
        args.script.clone(),
        args.out.clone(),
        args.reference.clone(),
    );

    match res {
        Ok(_) => info!("Election replayed successfully"),
        Err(e) => {
            eprintln!("An error occured: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("{}", bt);
            }
            std::process::exit(1);
        }
    }
}
