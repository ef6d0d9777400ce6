use clap::{ArgAction, Parser, Subcommand};

use self::{
    default_config::DefaultConfigArg, describe::DescribeArg, fit::FitArg, run::RunArg,
};
use crate::logging;

mod default_config;
mod describe;
mod fit;
mod run;
mod table;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Clean, segment and fit the visit extracts
    Run(#[clap(flatten)] RunArg),
    /// Fit distributions to a one-value-per-line sample file
    Fit(#[clap(flatten)] FitArg),
    /// Describe a one-value-per-line sample file
    Describe(#[clap(flatten)] DescribeArg),
    /// Print the default configuration as TOML
    DefaultConfig(#[clap(flatten)] DefaultConfigArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    logging::init(args.verbose);
    match args.mode {
        Mode::Run(arg) => run::run(&arg)?,
        Mode::Fit(arg) => fit::run(&arg)?,
        Mode::Describe(arg) => describe::run(&arg)?,
        Mode::DefaultConfig(arg) => default_config::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use edflow_stats::fit::Family;

    use super::*;

    #[test]
    fn test_parse_fit_families() {
        let args = CommandArgs::try_parse_from([
            "edflow", "-vv", "fit", "gaps.txt", "--families", "gamma,LogNormal", "--no-narrow",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        let Mode::Fit(arg) = args.mode else {
            panic!("expected fit mode");
        };
        assert_eq!(arg.families, [Family::Gamma, Family::LogNormal]);
        assert!(arg.no_narrow);
    }

    #[test]
    fn test_fit_defaults_to_all_families() {
        let args = CommandArgs::try_parse_from(["edflow", "fit", "gaps.txt"]).unwrap();
        let Mode::Fit(arg) = args.mode else {
            panic!("expected fit mode");
        };
        assert_eq!(arg.families, Family::ALL);
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(CommandArgs::try_parse_from(["edflow"]).is_err());
    }
}
