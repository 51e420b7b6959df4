//! `kitchen-ssh converge`: ship the provisioner sandbox and run it.

use anyhow::Result;

use crate::app::AppContext;

/// Run `kitchen-ssh converge`.
///
/// # Errors
///
/// Returns an error if the instance was never created or any converge step
/// fails.
pub async fn run(app: &AppContext) -> Result<()> {
    app.output.step("Converging", &app.instance);
    let state = app.require_state().await?;
    let mut provisioner = app.provisioner();
    app.driver.converge(&state, &mut provisioner).await?;
    app.output.success("Converge finished.");
    Ok(())
}
