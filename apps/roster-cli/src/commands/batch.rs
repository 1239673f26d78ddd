use roster_batch::{
    resolve_targets, user_id_set, BatchKind, BatchRunner, ProgressState, Target, TargetSelection,
};
use roster_remote::{AccessLevel, BatchResult, ExpiresAt, ProjectRef, RemoteDirectory};
use roster_storage::UserId;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use crate::cli::{Cli, TargetArgs};
use crate::config::{resolve_access_level, resolve_group, resolve_project};
use crate::context::{open_store, setup_client};

fn selection(targets: &TargetArgs) -> Result<TargetSelection, Box<dyn std::error::Error>> {
    if !targets.users.is_empty() {
        return Ok(TargetSelection::users(targets.users.iter().copied()));
    }
    resolve_group(targets.group)
        .map(TargetSelection::Group)
        .ok_or_else(|| "no targets: pass --users or --group (or set defaults.group in roster.toml)".into())
}

async fn resolve(
    cli: &Cli,
    targets: &TargetArgs,
) -> Result<Vec<Target>, Box<dyn std::error::Error>> {
    let selection = selection(targets)?;
    let store = open_store(cli).await?;
    Ok(resolve_targets(&store, &selection).await?)
}

fn report_progress(state: &ProgressState) {
    match (state.kind(), state.current_user_label()) {
        (Some(BatchKind::Add), Some(label)) => {
            eprintln!("[{}/{}] adding {}", state.processed() + 1, state.total(), label);
        }
        (Some(BatchKind::Remove), None) if state.is_running() => {
            eprintln!("removing {} user(s)", state.total());
        }
        _ => {}
    }
}

/// Human-readable outcome, failures in processing order.
pub fn summary_lines(
    kind: BatchKind,
    result: &BatchResult,
    labels: &HashMap<UserId, String>,
) -> Vec<String> {
    let mut lines = vec![format!(
        "Batch {} finished: {} succeeded, {} failed",
        kind,
        result.success_count(),
        result.failed_count()
    )];
    if !result.failed.is_empty() {
        lines.push("Failed:".to_string());
        for item in &result.failed {
            let who = labels
                .get(&item.user_id)
                .filter(|l| **l != item.user_id.to_string())
                .map(|l| format!("{} ({})", l, item.user_id))
                .unwrap_or_else(|| item.user_id.to_string());
            lines.push(format!("  {}: {}", who, item.reason));
        }
    }
    lines
}

fn finish(
    kind: BatchKind,
    result: &BatchResult,
    targets: &[Target],
) -> Result<(), Box<dyn std::error::Error>> {
    let labels: HashMap<UserId, String> = targets
        .iter()
        .map(|t| (t.user_id, t.display_label()))
        .collect();
    for line in summary_lines(kind, result, &labels) {
        println!("{}", line);
    }

    if result.is_complete_success() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} item(s) failed",
            result.failed_count(),
            result.success_count() + result.failed_count()
        )
        .into())
    }
}

async fn print_member_count(client: &dyn RemoteDirectory, project: &ProjectRef) {
    match client.list_members(project, 1, 1).await {
        Ok(page) => println!("{} now has {} member(s)", project, page.total),
        Err(e) => tracing::warn!(project = %project, error = %e, "could not refresh member count"),
    }
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    eprint!("{} [y/N] ", prompt);
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub async fn cmd_batch_add(
    cli: &Cli,
    project: Option<&ProjectRef>,
    targets: &TargetArgs,
    access_level: Option<AccessLevel>,
    expires_at: Option<ExpiresAt>,
) -> Result<(), Box<dyn std::error::Error>> {
    let project = resolve_project(project)?;
    let access_level = resolve_access_level(access_level)?;
    let targets = resolve(cli, targets).await?;

    let client = Arc::new(setup_client(cli)?);
    let runner = BatchRunner::new(client.clone());

    let result = runner
        .run_add_batch(&project, &targets, access_level, expires_at, &report_progress)
        .await?;

    print_member_count(client.as_ref(), &project).await;
    finish(BatchKind::Add, &result, &targets)
}

pub async fn cmd_batch_remove(
    cli: &Cli,
    project: Option<&ProjectRef>,
    targets: &TargetArgs,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let project = resolve_project(project)?;
    let targets = resolve(cli, targets).await?;
    let user_ids = user_id_set(&targets);

    if !yes && !confirm(&format!("Remove {} user(s) from {}?", user_ids.len(), project))? {
        println!("Aborted");
        return Ok(());
    }

    let client = Arc::new(setup_client(cli)?);
    let runner = BatchRunner::new(client.clone());

    let result = runner
        .run_remove_batch(&project, &user_ids, &report_progress)
        .await?;

    print_member_count(client.as_ref(), &project).await;
    finish(BatchKind::Remove, &result, &targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_remote::FailedItem;

    #[test]
    fn summary_lists_failures_with_labels() {
        let result = BatchResult {
            success_user_ids: [UserId(1), UserId(2)].into_iter().collect(),
            failed: vec![
                FailedItem {
                    user_id: UserId(3),
                    reason: "insufficient access".into(),
                },
                FailedItem {
                    user_id: UserId(4),
                    reason: "request failed: network timeout".into(),
                },
            ],
        };
        let labels: HashMap<_, _> = [
            (UserId(3), "carol".to_string()),
            (UserId(4), "4".to_string()),
        ]
        .into_iter()
        .collect();

        let lines = summary_lines(BatchKind::Add, &result, &labels);
        assert_eq!(
            lines,
            vec![
                "Batch add finished: 2 succeeded, 2 failed",
                "Failed:",
                "  carol (3): insufficient access",
                "  4: request failed: network timeout",
            ]
        );
    }

    #[test]
    fn summary_for_clean_run_is_one_line() {
        let result = BatchResult {
            success_user_ids: [UserId(9)].into_iter().collect(),
            failed: vec![],
        };
        let lines = summary_lines(BatchKind::Remove, &result, &HashMap::new());
        assert_eq!(lines, vec!["Batch remove finished: 1 succeeded, 0 failed"]);
        assert!(finish(BatchKind::Remove, &result, &[]).is_ok());
    }

    #[test]
    fn failures_make_the_command_fail() {
        let result = BatchResult {
            success_user_ids: Default::default(),
            failed: vec![FailedItem {
                user_id: UserId(5),
                reason: "403 Forbidden".into(),
            }],
        };
        let err = finish(BatchKind::Add, &result, &[Target::new(UserId(5))]).unwrap_err();
        assert_eq!(err.to_string(), "1 of 1 item(s) failed");
    }
}
