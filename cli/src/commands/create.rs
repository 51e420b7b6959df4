//! `kitchen-ssh create`: record the instance and wait for SSH.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::StateStore;

/// Arguments for the create command.
#[derive(Args, Default)]
pub struct CreateArgs {
    /// Do not wait for the instance to accept SSH logins
    #[arg(long)]
    pub no_wait: bool,
}

/// Run `kitchen-ssh create`.
///
/// Already-created instances are left untouched.
///
/// # Errors
///
/// Returns an error if the backend fails, SSH never becomes ready, or the
/// state cannot be saved.
pub async fn run(args: &CreateArgs, app: &AppContext) -> Result<()> {
    app.output.step("Creating", &app.instance);
    let mut state = app.state.load().await?.unwrap_or_default();
    if !state.is_unprovisioned() {
        app.output.warn("Instance already created.");
        return Ok(());
    }

    app.driver.create(&mut state).await?;
    app.state.save(&state).await?;

    let descriptor = app.driver.connection(&state);
    if !args.no_wait {
        app.driver
            .wait_for_ready(&descriptor.host, &descriptor.user, &descriptor.options)
            .await?;
    }
    app.output
        .success(&format!("Instance created: {}", descriptor.target()));
    Ok(())
}
