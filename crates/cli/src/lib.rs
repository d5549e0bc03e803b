pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::render::RenderArgs;

#[derive(Debug, Parser)]
#[command(
    name = "athena",
    about = "Athena Slackbot demo CLI",
    long_about = "Render demo screens, play the scripted walkthrough, inspect configuration, and run smoke validation.",
    after_help = "Examples:\n  athena render --scenario auto-pr --gap retry-logic-stripe\n  athena walkthrough --speed 4\n  athena config\n  athena smoke"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Render one demo screen as it looks once fully revealed")]
    Render {
        #[arg(long, help = "Scenario to show: digest, auto-pr or qna")]
        scenario: Option<String>,
        #[arg(long, help = "Knowledge gap id to select")]
        gap: Option<String>,
        #[arg(long, help = "Include the guided tour overlay")]
        help_tour: bool,
        #[arg(long, help = "Show a Q&A thread after the expert answered with the recommended pattern")]
        answered: bool,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Play the scripted digest, auto-PR and Q&A walkthrough in real time")]
    Walkthrough {
        #[arg(long, default_value_t = 1.0, help = "Playback speed multiplier")]
        speed: f64,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config {
        #[arg(long, help = "Print the effective configuration as a TOML document")]
        toml: bool,
    },
    #[command(about = "Run readiness checks with per-check timing details")]
    Smoke,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Render { scenario, gap, help_tour, answered, json } => {
            commands::render::run(&RenderArgs { scenario, gap, help_tour, answered, json })
        }
        Command::Walkthrough { speed } => commands::walkthrough::run(speed),
        Command::Config { toml } => commands::config::run(toml),
        Command::Smoke => commands::smoke::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
