use std::process::ExitCode;

use clap::Parser;
use gridplanner::settings::EditorSettings;
use gridplanner::{cli, logger};

fn main() -> ExitCode {
    // Session log (overwrites previous session log)
    logger::init();

    let settings = EditorSettings::load();
    let args = cli::CliArgs::parse();
    cli::run(args, &settings)
}
