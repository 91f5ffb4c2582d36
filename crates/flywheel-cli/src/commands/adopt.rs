//! `flywheel adopt`: run (or only verify) the adoption plan.

use super::Context;
use crate::adopt::{Drift, Reconciler, failure_count};
use crate::error::{CliError, CliResult};
use crate::output::{self, Table};
use colored::Colorize;
use flywheel_kernel::adoption::AdoptionOutcome;
use tracing::warn;

/// Adopt every planned object under its owning release.
pub async fn adopt_all(ctx: &Context) -> Vec<AdoptionOutcome> {
    let cluster = ctx.cluster();
    let mut outcomes = Vec::new();
    for (release, plan) in ctx.adoption_releases() {
        let reconciler = Reconciler::new(&cluster, release);
        outcomes.extend(reconciler.adopt_plan(&plan).await);
    }
    outcomes
}

async fn verify_all(ctx: &Context) -> (Vec<(String, Drift)>, usize) {
    let cluster = ctx.cluster();
    let mut drift = Vec::new();
    let mut list_failures = 0;
    for (release, plan) in ctx.adoption_releases() {
        let reconciler = Reconciler::new(&cluster, release);
        for target in &plan.targets {
            match reconciler.verify(target.kind, &target.filter).await {
                Ok(found) => drift.extend(
                    found
                        .into_iter()
                        .map(|d| (reconciler.release().name.clone(), d)),
                ),
                Err(e) => {
                    warn!(kind = %target.kind, error = %e, "cannot list kind");
                    list_failures += 1;
                }
            }
        }
    }
    (drift, list_failures)
}

pub async fn run(ctx: &Context, verify_only: bool) -> CliResult<()> {
    ctx.preflight(&[]).await?;

    if verify_only {
        output::step("Checking ownership of planned objects");
        let (drift, list_failures) = verify_all(ctx).await;
        if drift.is_empty() && list_failures == 0 {
            output::success("Every existing planned object belongs to its release");
            return Ok(());
        }
        let mut table = Table::builder().headers(&["Kind", "Name", "Expected release", "Stale managers"]);
        for (release, d) in &drift {
            table = table.add_row(&[
                d.kind.kind_name(),
                d.name.as_str(),
                release.as_str(),
                if d.stale_field_managers { "yes" } else { "no" },
            ]);
        }
        println!("{}", table.build());
        return Err(CliError::AdoptionIncomplete(drift.len() + list_failures));
    }

    output::step("Adopting leftover cluster objects");
    let outcomes = adopt_all(ctx).await;
    output::print_adoption(&outcomes);

    let adopted: usize = outcomes.iter().map(|o| o.adopted.len()).sum();
    let failed = failure_count(&outcomes);
    println!(
        "Adopted {}, failed {}",
        adopted.to_string().green(),
        failed.to_string().red()
    );
    if failed > 0 {
        return Err(CliError::AdoptionIncomplete(failed));
    }
    Ok(())
}
