//! `kitchen-ssh exec`: run one command on the instance.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;

/// Arguments for the exec command.
#[derive(Args)]
#[command(trailing_var_arg = true)]
pub struct ExecArgs {
    /// Command and arguments to run on the instance
    #[arg(required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Run `kitchen-ssh exec -- <command>`.
///
/// # Errors
///
/// Returns an error if the instance was never created or the command fails.
pub async fn run(args: &ExecArgs, app: &AppContext) -> Result<()> {
    let state = app.require_state().await?;
    app.driver
        .remote_command(&state, &args.command.join(" "))
        .await?;
    Ok(())
}
