//! `kitchen-ssh setup`: prepare the test tool on the instance.

use anyhow::Result;

use crate::app::AppContext;

/// Run `kitchen-ssh setup`.
///
/// # Errors
///
/// Returns an error if the instance was never created or the setup command
/// fails.
pub async fn run(app: &AppContext) -> Result<()> {
    app.output.step("Setting up", &app.instance);
    let state = app.require_state().await?;
    app.driver.setup(&state, &app.verifier()).await?;
    app.output.success("Setup finished.");
    Ok(())
}
