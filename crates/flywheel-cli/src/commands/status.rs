//! `flywheel status`: releases and pod readiness.

use super::Context;
use crate::error::CliResult;
use crate::output::{self, Table};
use crate::wait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Release {
    pub name: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub chart: String,
}

pub fn parse_releases(json: &str) -> CliResult<Vec<Release>> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(json)?)
}

pub async fn run(ctx: &Context) -> CliResult<()> {
    ctx.preflight(&["helm"]).await?;

    let list = ctx.helm(["list", "-o", "json"]).read_only();
    let releases = parse_releases(&ctx.runner().run_checked(&list).await?)?;
    output::step(&format!("Releases in {}", ctx.config.namespace));
    let mut table = Table::builder().headers(&["Release", "Revision", "Chart", "Status"]);
    for r in &releases {
        table = table.add_status_row(
            &[r.name.as_str(), r.revision.as_str(), r.chart.as_str()],
            &r.status,
            r.status == "deployed",
        );
    }
    println!("{}", table.build());

    let pods = wait::pods(ctx.runner(), &ctx.config, None).await?;
    output::step(&format!("Pods in {}", ctx.config.namespace));
    let mut table = Table::builder().headers(&["Pod", "Phase", "Ready"]);
    for p in &pods {
        table = table.add_status_row(
            &[p.name.as_str(), p.phase.as_str()],
            &format!("{}/{}", p.ready, p.total),
            p.is_settled(),
        );
    }
    println!("{}", table.build());

    let unsettled = pods.iter().filter(|p| !p.is_settled()).count();
    if unsettled > 0 {
        output::warning(&format!("{unsettled} pod(s) not ready"));
    }
    Ok(())
}
