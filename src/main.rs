use clap::{CommandFactory, Parser};
use log::{error, info};

use rusty_filter::cli::Args;
use rusty_filter::driver::{self, RunConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let result = RunConfig::try_from(args).and_then(|config| driver::run(&config));

    match result {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(json) => info!("run report: {json}"),
            Err(e) => error!("could not serialise run report: {e}"),
        },
        Err(e) => {
            let code = e.exit_code();
            eprintln!("Error: {e}");
            if code == 2 {
                eprintln!("{}", Args::command().render_usage());
            }
            std::process::exit(code);
        }
    }
}
