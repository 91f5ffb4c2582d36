//! Human-facing output: step headings, tables and spinners.

mod progress;
mod table;

pub use progress::Spinner;
pub use table::{Table, TableBuilder};

use colored::Colorize;
use flywheel_kernel::adoption::AdoptionOutcome;

/// Heading printed when a step starts.
pub fn step(title: &str) {
    println!("{} {}", "→".green(), title.bold());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "!".yellow(), message.yellow());
}

/// Per-kind adoption summary.
pub fn adoption_table(outcomes: &[AdoptionOutcome]) -> Table {
    let mut builder = Table::builder().headers(&["Kind", "Matched", "Adopted", "Owned", "Failed"]);
    for outcome in outcomes {
        let kind = outcome
            .kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".to_string());
        builder = builder.add_row(&[
            kind.as_str(),
            &outcome.matched.len().to_string(),
            &outcome.adopted.len().to_string(),
            &outcome.already_owned.len().to_string(),
            &outcome.failed.len().to_string(),
        ]);
    }
    builder.build()
}

/// Print the summary table followed by one line per failed object.
pub fn print_adoption(outcomes: &[AdoptionOutcome]) {
    println!("{}", adoption_table(outcomes));
    for outcome in outcomes {
        for (name, reason) in &outcome.failed {
            println!("  {} {} {}: {}", "✗".red(), outcome.kind.map(|k| k.to_string()).unwrap_or_default(), name, reason);
        }
    }
}
