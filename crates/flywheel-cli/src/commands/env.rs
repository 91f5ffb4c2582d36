//! `flywheel env`: in-cluster service endpoints as shell exports.

use crate::config::DeployConfig;

pub fn render(config: &DeployConfig) -> String {
    config
        .service_endpoints()
        .into_iter()
        .map(|(key, url)| format!("export {key}=\"{url}\"\n"))
        .collect()
}

pub fn run(config: &DeployConfig) {
    print!("{}", render(config));
}
