//! `kitchen-ssh verify`: sync and run the tests on the instance.

use anyhow::Result;

use crate::app::AppContext;

/// Run `kitchen-ssh verify`.
///
/// # Errors
///
/// Returns an error if the instance was never created or a test command
/// fails.
pub async fn run(app: &AppContext) -> Result<()> {
    app.output.step("Verifying", &app.instance);
    let state = app.require_state().await?;
    app.driver.verify(&state, &app.verifier()).await?;
    app.output.success("Verify finished.");
    Ok(())
}
