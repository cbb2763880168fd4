mod cmd;

use clap::Parser;
use sht_core::testing::DiscoveryError;

use crate::cmd::Args;

/// Discovery-fatal problems get their own exit code so callers can tell
/// "the suite failed" from "the suite never ran".
const EXIT_DISCOVERY_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    let code = cmd::exec(&args).await.unwrap_or_else(|e| {
        eprintln!("Error: {:#}", e);
        if e.downcast_ref::<DiscoveryError>().is_some() {
            EXIT_DISCOVERY_ERROR
        } else {
            1
        }
    });
    std::process::exit(code);
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}
