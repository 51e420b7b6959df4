//! `kitchen-ssh login`: interactive shell on the instance.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::CommandRunner;

/// Arguments for the login command.
#[derive(Args, Default)]
pub struct LoginArgs {
    /// Print the ssh invocation instead of running it
    #[arg(long)]
    pub print: bool,
}

/// Run `kitchen-ssh login`.
///
/// # Errors
///
/// Returns an error if the instance was never created or ssh cannot be
/// spawned.
pub async fn run(args: &LoginArgs, app: &AppContext, runner: &impl CommandRunner) -> Result<ExitCode> {
    let state = app.require_state().await?;
    let login = app.driver.login_command(&state);
    if args.print {
        println!("{login}");
        return Ok(ExitCode::SUCCESS);
    }

    let argv: Vec<&str> = login.args.iter().map(String::as_str).collect();
    let status = runner.run_status(&login.program, &argv).await?;
    let code = status.code().unwrap_or(1);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(ExitCode::from(code as u8))
}
