//! `flywheel bootstrap`: namespace, pull/API secrets, SCC grant.

use super::Context;
use crate::config::{IMAGE_PULL_SECRET, NGC_API_SECRET};
use crate::error::CliResult;
use crate::output;
use crate::preflight;
use crate::runner::CommandSpec;
use tracing::info;

const REGISTRY: &str = "nvcr.io";
/// NGC registry logins use this literal user name with the API key as password.
const NGC_USERNAME: &str = "$oauthtoken";

pub async fn run(ctx: &Context) -> CliResult<()> {
    let config = &ctx.config;
    let key = config.require_ngc_api_key("bootstrap")?.to_string();

    output::step(&format!("Bootstrapping namespace {}", config.namespace));
    preflight::require_binaries(&[config.tool.as_str()])?;
    let user = preflight::require_login(ctx.runner(), config).await?;
    info!(%user, "logged in");

    ensure_namespace(ctx).await?;
    apply_secret(ctx, docker_registry_secret(ctx, &key)).await?;
    apply_secret(ctx, ngc_api_secret(ctx, &key)).await?;
    output::success(&format!("Secrets {IMAGE_PULL_SECRET} and {NGC_API_SECRET} applied"));

    grant_anyuid(ctx).await?;
    output::success("Bootstrap complete");
    Ok(())
}

async fn ensure_namespace(ctx: &Context) -> CliResult<()> {
    let ns = ctx.config.namespace.as_str();
    if preflight::namespace_exists(ctx.runner(), &ctx.config).await? {
        output::success(&format!("Namespace {ns} exists"));
        return Ok(());
    }
    let spec = if ctx.config.tool == "oc" {
        ctx.kube().args(["new-project", ns])
    } else {
        ctx.kube().args(["create", "namespace", ns])
    };
    ctx.runner().run_checked(&spec).await?;
    output::success(&format!("Namespace {ns} created"));
    Ok(())
}

fn docker_registry_secret(ctx: &Context, key: &str) -> CommandSpec {
    ctx.kube()
        .args(["create", "secret", "docker-registry", IMAGE_PULL_SECRET])
        .arg(format!("--docker-server={REGISTRY}"))
        .arg(format!("--docker-username={NGC_USERNAME}"))
        .secret_arg(format!("--docker-password={key}"), key)
}

fn ngc_api_secret(ctx: &Context, key: &str) -> CommandSpec {
    ctx.kube()
        .args(["create", "secret", "generic", NGC_API_SECRET])
        .secret_arg(format!("--from-literal=NGC_API_KEY={key}"), key)
}

/// Render with a client-side dry run, then apply, so re-running refreshes
/// an existing secret instead of failing on "already exists".
async fn apply_secret(ctx: &Context, create: CommandSpec) -> CliResult<()> {
    let render = create
        .args(["-n", ctx.config.namespace.as_str(), "--dry-run=client", "-o", "yaml"])
        .read_only();
    let manifest = ctx.runner().run_checked(&render).await?;
    let apply = ctx
        .kube()
        .args(["apply", "-n", ctx.config.namespace.as_str(), "-f", "-"])
        .stdin(manifest);
    ctx.runner().run_checked(&apply).await?;
    Ok(())
}

async fn grant_anyuid(ctx: &Context) -> CliResult<()> {
    if ctx.config.tool != "oc" {
        output::warning("Skipping anyuid SCC grant: only available with `oc`");
        return Ok(());
    }
    let spec = ctx.kube().args([
        "adm",
        "policy",
        "add-scc-to-user",
        "anyuid",
        "-z",
        "default",
        "-n",
        ctx.config.namespace.as_str(),
    ]);
    ctx.runner().run_checked(&spec).await?;
    output::success("Granted anyuid SCC to the default service account");
    Ok(())
}
