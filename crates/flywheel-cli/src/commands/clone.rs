//! `flywheel clone`: fetch the Data Flywheel repository and register the
//! chart repositories the install steps pull from.

use super::Context;
use crate::config::{DATA_FLYWHEEL_REPO, NEMO_HELM_REPO, VOLCANO_HELM_REPO};
use crate::error::CliResult;
use crate::output;
use crate::preflight;
use crate::runner::CommandSpec;

const NEMO_REPO_NAME: &str = "nemo-microservices";
const VOLCANO_REPO_NAME: &str = "volcano-sh";
const CHECKOUT_DIR: &str = "data-flywheel";

pub async fn run(ctx: &Context) -> CliResult<()> {
    let config = &ctx.config;
    let key = config.require_ngc_api_key("clone")?.to_string();
    preflight::require_binaries(&["git", "helm"])?;

    let checkout = config.workdir.join(CHECKOUT_DIR);
    if checkout.join(".git").exists() {
        output::success(&format!("{} already cloned, skipping", checkout.display()));
    } else {
        output::step(&format!("Cloning {DATA_FLYWHEEL_REPO}"));
        let spec = CommandSpec::new("git")
            .args(["clone", "--depth", "1", DATA_FLYWHEEL_REPO])
            .arg(checkout.display().to_string());
        ctx.runner().run_checked(&spec).await?;
        output::success(&format!("Cloned into {}", checkout.display()));
    }

    output::step("Registering chart repositories");
    let nemo = CommandSpec::new("helm")
        .args(["repo", "add", NEMO_REPO_NAME, NEMO_HELM_REPO, "--force-update"])
        .arg("--username=$oauthtoken")
        .secret_arg(format!("--password={key}"), &key);
    ctx.runner().run_checked(&nemo).await?;

    let volcano = CommandSpec::new("helm").args([
        "repo",
        "add",
        VOLCANO_REPO_NAME,
        VOLCANO_HELM_REPO,
        "--force-update",
    ]);
    ctx.runner().run_checked(&volcano).await?;

    ctx.runner()
        .run_checked(&CommandSpec::new("helm").args(["repo", "update"]))
        .await?;
    output::success("Chart repositories ready");
    Ok(())
}
