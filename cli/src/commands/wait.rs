//! `kitchen-ssh wait`: block until the instance accepts SSH logins.

use anyhow::Result;

use crate::app::AppContext;

/// Run `kitchen-ssh wait`.
///
/// # Errors
///
/// Returns an error if the instance was never created or SSH does not become
/// ready within `driver.ready_timeout`.
pub async fn run(app: &AppContext) -> Result<()> {
    let state = app.require_state().await?;
    let descriptor = app.driver.connection(&state);
    app.driver
        .wait_for_ready(&descriptor.host, &descriptor.user, &descriptor.options)
        .await?;
    app.output
        .success(&format!("{} is accepting logins.", descriptor.target()));
    Ok(())
}
