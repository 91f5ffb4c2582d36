//! `flywheel verify`: HTTP checks through the gateway, reported doctor-style.

use crate::config::DeployConfig;
use crate::error::{CliError, CliResult};
use colored::Colorize;
use serde::Serialize;
use std::time::Duration;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckSeverity {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Serialize)]
pub struct VerifyCheck {
    pub id: String,
    pub title: String,
    pub severity: CheckSeverity,
    pub details: String,
    pub recommendation: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VerifySummary {
    pub passed: usize,
    pub warnings: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize)]
pub struct VerifyReport {
    pub gateway_url: String,
    pub namespace: String,
    pub summary: VerifySummary,
    pub checks: Vec<VerifyCheck>,
}

/// One probe: a path on the gateway and what should answer it.
struct Probe {
    id: &'static str,
    title: &'static str,
    path: &'static str,
    /// Body must equal this exactly.
    expect_body: Option<&'static str>,
    required: bool,
}

const PROBES: &[Probe] = &[
    Probe {
        id: "gateway-health",
        title: "Gateway /healthz",
        path: "/healthz",
        expect_body: Some("OK"),
        required: true,
    },
    Probe {
        id: "gateway-routes",
        title: "Gateway route table",
        path: "/gateway/routes",
        expect_body: None,
        required: false,
    },
    Probe {
        id: "datastore",
        title: "Datastore via gateway",
        path: "/v1/datasets",
        expect_body: None,
        required: true,
    },
    Probe {
        id: "entity-store",
        title: "Entity store via gateway",
        path: "/v1/namespaces",
        expect_body: None,
        required: true,
    },
    Probe {
        id: "app-api",
        title: "Data Flywheel API via gateway",
        path: "/api/jobs",
        expect_body: None,
        required: true,
    },
];

pub async fn run(config: &DeployConfig, json: bool) -> CliResult<()> {
    let report = build_report(config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.summary.failed > 0 {
        return Err(CliError::VerificationFailed(report.summary.failed));
    }
    Ok(())
}

pub async fn build_report(config: &DeployConfig) -> CliResult<VerifyReport> {
    let client = reqwest::Client::builder().timeout(CHECK_TIMEOUT).build()?;
    let base = config.gateway_base_url();

    let mut checks = Vec::with_capacity(PROBES.len());
    for probe in PROBES {
        checks.push(run_probe(&client, &base, probe).await);
    }
    let summary = summarize_checks(&checks);

    Ok(VerifyReport {
        gateway_url: base,
        namespace: config.namespace.clone(),
        summary,
        checks,
    })
}

async fn run_probe(client: &reqwest::Client, base: &str, probe: &Probe) -> VerifyCheck {
    let url = format!("{base}{}", probe.path);
    let (severity, details, recommendation) = match client.get(&url).send().await {
        Err(e) => (
            miss(probe),
            format!("GET {url} failed: {e}"),
            Some("Check that the gateway service is reachable from here (GATEWAY_URL).".to_string()),
        ),
        Ok(resp) => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            classify(probe, status.as_u16(), &body, &url)
        }
    };
    VerifyCheck {
        id: probe.id.to_string(),
        title: probe.title.to_string(),
        severity,
        details,
        recommendation,
    }
}

fn miss(probe: &Probe) -> CheckSeverity {
    if probe.required {
        CheckSeverity::Fail
    } else {
        CheckSeverity::Warn
    }
}

/// Any answer below 500 proves the backend is wired up; 502/504 are the
/// gateway reporting an unreachable or slow backend.
fn classify(
    probe: &Probe,
    status: u16,
    body: &str,
    url: &str,
) -> (CheckSeverity, String, Option<String>) {
    if let Some(expected) = probe.expect_body
        && status == 200
        && body.trim() != expected
    {
        return (
            miss(probe),
            format!("GET {url} returned 200 with unexpected body {:?}", body.trim()),
            None,
        );
    }
    match status {
        200..=499 => (CheckSeverity::Pass, format!("GET {url} -> {status}"), None),
        502 | 503 | 504 => (
            miss(probe),
            format!("GET {url} -> {status}: backend unreachable or timing out"),
            Some("Run `flywheel status` and check the backend pods.".to_string()),
        ),
        _ => (
            CheckSeverity::Warn,
            format!("GET {url} -> {status}"),
            Some("The backend answered with a server error; check its logs.".to_string()),
        ),
    }
}

fn summarize_checks(checks: &[VerifyCheck]) -> VerifySummary {
    let count = |severity| checks.iter().filter(|c| c.severity == severity).count();
    VerifySummary {
        passed: count(CheckSeverity::Pass),
        warnings: count(CheckSeverity::Warn),
        failed: count(CheckSeverity::Fail),
    }
}

fn print_report(report: &VerifyReport) {
    println!("{} Flywheel Verify Report", "→".green());
    println!("  Gateway: {}", report.gateway_url.cyan());
    println!("  Namespace: {}", report.namespace.yellow());
    println!();

    for check in &report.checks {
        let (icon, colorized_title) = match check.severity {
            CheckSeverity::Pass => ("✓".green(), check.title.green()),
            CheckSeverity::Warn => ("!".yellow(), check.title.yellow()),
            CheckSeverity::Fail => ("✗".red(), check.title.red()),
        };

        println!("{} {} [{}]", icon, colorized_title, check.id);
        println!("    {}", check.details);
        if let Some(recommendation) = &check.recommendation {
            println!("    Recommendation: {}", recommendation);
        }
    }

    println!();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        report.summary.passed.to_string().green(),
        report.summary.warnings.to_string().yellow(),
        report.summary.failed.to_string().red()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config_for(url: String) -> DeployConfig {
        DeployConfig {
            gateway_url: Some(url),
            ..Default::default()
        }
    }

    #[test]
    fn health_body_must_match() {
        let probe = &PROBES[0];
        assert_eq!(classify(probe, 200, "OK\n", "u").0, CheckSeverity::Pass);
        assert_eq!(classify(probe, 200, "hello", "u").0, CheckSeverity::Fail);
        assert_eq!(classify(&PROBES[2], 404, "", "u").0, CheckSeverity::Pass);
        assert_eq!(classify(&PROBES[2], 502, "", "u").0, CheckSeverity::Fail);
        assert_eq!(classify(&PROBES[1], 504, "", "u").0, CheckSeverity::Warn);
        assert_eq!(classify(&PROBES[2], 500, "", "u").0, CheckSeverity::Warn);
    }

    #[tokio::test]
    async fn healthy_gateway_passes() {
        let app = Router::new()
            .route("/healthz", get(|| async { "OK" }))
            .fallback(|| async { (StatusCode::NOT_FOUND, "{}") });
        let report = build_report(&config_for(spawn(app).await)).await.unwrap();
        assert_eq!(
            report.summary,
            VerifySummary {
                passed: 5,
                warnings: 0,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn bad_gateway_backends_fail() {
        let app = Router::new()
            .route("/healthz", get(|| async { "OK" }))
            .fallback(|| async { StatusCode::BAD_GATEWAY });
        let report = build_report(&config_for(spawn(app).await)).await.unwrap();
        assert_eq!(report.summary.failed, 3);
        assert_eq!(report.summary.warnings, 1);

        let err = run(&config_for(report.gateway_url.clone()), true).await.unwrap_err();
        assert!(matches!(err, CliError::VerificationFailed(3)));
    }
}
