//! `kitchen-ssh destroy`: tear the instance down and forget it.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::StateStore;

/// Run `kitchen-ssh destroy`.
///
/// Destroying an instance that was never created is a no-op.
///
/// # Errors
///
/// Returns an error if the backend fails or the state cannot be removed.
pub async fn run(app: &AppContext) -> Result<()> {
    app.output.step("Destroying", &app.instance);
    let Some(mut state) = app.state.load().await? else {
        app.output.warn("Instance not created, nothing to destroy.");
        return Ok(());
    };

    app.driver.destroy(&mut state).await?;
    app.state.clear().await?;
    app.output.success("Instance destroyed.");
    Ok(())
}
