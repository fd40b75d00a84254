use std::path::Path;
use std::sync::Arc;

use snippetly_core::config::SnippetlyConfig;
use snippetly_core::{SyncDriver, SyncOutcome, SyncReport, SyncState};
use serde::Serialize;

use crate::commands::common::{open_queue, short_id};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncResultItem<'a> {
    pub state: SyncState,
    pub report: &'a SyncReport,
}

pub async fn run_sync(
    config: &SnippetlyConfig,
    store_path: &Path,
    as_json: bool,
) -> Result<(), CliError> {
    let remote = config
        .require_remote()
        .map_err(|_| CliError::SyncNotConfigured)?;
    let client = remote.client()?;
    let queue = Arc::new(open_queue(store_path, config)?);

    let driver = SyncDriver::new(queue, client).with_settle_delay(config.sync_settle_delay);
    match driver.sync().await {
        SyncOutcome::Skipped => {
            println!("A sync is already running");
            Ok(())
        }
        SyncOutcome::Completed(report) => {
            let state = driver.state();
            if as_json {
                let item = SyncResultItem {
                    state,
                    report: &report,
                };
                println!("{}", serde_json::to_string_pretty(&item)?);
            } else {
                for line in format_sync_report_lines(&report, state) {
                    println!("{line}");
                }
            }
            if report.is_clean() {
                Ok(())
            } else {
                Err(CliError::SyncIncomplete(report.failed))
            }
        }
    }
}

pub fn format_sync_report_lines(report: &SyncReport, state: SyncState) -> Vec<String> {
    let mut lines = vec![report.summary()];
    if report.attempted > 0 {
        lines.push(format!(
            "{} of {} change(s) synced",
            report.synced, report.attempted
        ));
    }
    lines.extend(report.failures.iter().map(|failure| {
        format!(
            "  {} {}: {}",
            short_id(failure.action_id.as_str()),
            failure.kind,
            failure.reason
        )
    }));
    lines.push(format!("Sync state: {}", state.label()));
    lines
}
