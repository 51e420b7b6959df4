//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Drive instances over SSH through create, converge, setup, verify and destroy
#[derive(Parser)]
#[command(
    name = "kitchen-ssh",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Configuration file [default: .kitchen-ssh.yml]
    #[arg(long, global = true, env = "KITCHEN_SSH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Instance name (selects .kitchen/<instance>.json)
    #[arg(short, long, global = true, default_value = "default")]
    pub instance: String,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record the instance and wait for SSH
    Create(commands::create::CreateArgs),

    /// Ship and run the provisioner
    Converge,

    /// Prepare the test tool
    Setup,

    /// Run the tests
    Verify,

    /// Destroy the instance
    Destroy,

    /// Create, converge, setup, verify and destroy
    Test(commands::test::TestArgs),

    /// Run a command on the instance
    Exec(commands::exec::ExecArgs),

    /// Open an interactive shell on the instance
    Login(commands::login::LoginArgs),

    /// Wait until the instance accepts SSH logins
    Wait,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be built or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            instance,
            verbose: _,
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(AppFlags {
            config,
            instance,
            no_color,
            quiet,
        })?;

        match command {
            Command::Create(args) => commands::create::run(&args, &app).await?,
            Command::Converge => commands::converge::run(&app).await?,
            Command::Setup => commands::setup::run(&app).await?,
            Command::Verify => commands::verify::run(&app).await?,
            Command::Destroy => commands::destroy::run(&app).await?,
            Command::Test(args) => commands::test::run(&args, &app).await?,
            Command::Exec(args) => commands::exec::run(&args, &app).await?,
            Command::Login(args) => {
                return commands::login::run(&args, &app, &app.process_runner()).await;
            }
            Command::Wait => commands::wait::run(&app).await?,
        }
        Ok(ExitCode::SUCCESS)
    }
}
