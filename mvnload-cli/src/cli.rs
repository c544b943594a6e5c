use crate::commands;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "mvnload",
    about = "resolve, fetch and load Maven-hosted artifacts at runtime",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the transitive dependency closure of a coordinate
    Resolve(commands::resolve::ResolveArgs),
    /// Resolve a coordinate and download every artifact in its closure
    Fetch(commands::fetch::FetchArgs),
    /// Fetch a closure, load its components and invoke a method
    Run(commands::run::RunArgs),
    /// Show the resolved configuration
    Config(commands::config::ConfigArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "mvnload",
            "run",
            "org.example:calc:1.0",
            "--component",
            "demo.Calculator",
            "--method",
            "add",
            "--",
            "2",
            "-3",
        ])
        .unwrap();

        let Command::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.component, "demo.Calculator");
        assert_eq!(args.args, vec!["2", "-3"]);
    }

    #[test]
    fn rejects_malformed_coordinates() {
        assert!(Cli::try_parse_from(["mvnload", "resolve", "not-a-coordinate"]).is_err());
    }
}
