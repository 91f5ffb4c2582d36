//! `flywheel cleanup`: uninstall releases in reverse install order.

use super::Context;
use crate::error::CliResult;
use crate::output;
use tracing::warn;

/// Releases in the order they are installed.
fn install_order(ctx: &Context) -> [&str; 4] {
    let c = &ctx.config;
    [
        c.volcano_release.as_str(),
        c.nemo_release.as_str(),
        c.infra_release.as_str(),
        c.app_release.as_str(),
    ]
}

pub async fn run(ctx: &Context, delete_namespace: bool) -> CliResult<()> {
    ctx.preflight(&["helm"]).await?;
    teardown(ctx, delete_namespace).await
}

async fn teardown(ctx: &Context, delete_namespace: bool) -> CliResult<()> {
    for release in install_order(ctx).into_iter().rev() {
        output::step(&format!("Uninstalling {release}"));
        let spec = ctx.helm(["uninstall", release, "--ignore-not-found"]);
        // Keep going so one broken release does not strand the others.
        match ctx.runner().run_checked(&spec).await {
            Ok(_) => output::success(&format!("{release} removed")),
            Err(e) => {
                warn!(%release, error = %e, "uninstall failed");
                output::warning(&format!("{release}: {e}"));
            }
        }
    }

    if delete_namespace {
        let ns = ctx.config.namespace.as_str();
        output::step(&format!("Deleting namespace {ns}"));
        let spec = ctx
            .kube()
            .args(["delete", "namespace", ns, "--ignore-not-found"]);
        ctx.runner().run_checked(&spec).await?;
        output::success(&format!("Namespace {ns} deleted"));
    }
    Ok(())
}
