use roster_remote::{AccessLevel, ProjectMember, ProjectRef, RemoteDirectory};
use roster_storage::{MembershipStore, UpsertMemberParams, UserId};
use std::collections::BTreeSet;

use crate::cli::{Cli, Paging};
use crate::config::resolve_project;
use crate::context::{open_store, setup_client};

pub async fn cmd_member_list(
    cli: &Cli,
    project: Option<&ProjectRef>,
    paging: &Paging,
) -> Result<(), Box<dyn std::error::Error>> {
    let project = resolve_project(project)?;
    let client = setup_client(cli)?;

    let page = client
        .list_members(&project, paging.page, paging.per_page)
        .await?;

    if page.items.is_empty() {
        println!("No members found");
        return Ok(());
    }

    println!(
        "Members of {} (page {} of {}, {} total):",
        project,
        paging.page,
        page.page_count(paging.per_page),
        page.total
    );
    for member in page.items {
        print_member(&member);
    }

    Ok(())
}

fn print_member(member: &ProjectMember) {
    let expires = member
        .expires_at
        .as_deref()
        .map(|e| format!("  expires {}", e))
        .unwrap_or_default();
    println!(
        "  {:>8}  {:<24} {:<24} {}{}",
        member.id,
        member.username,
        member.name,
        AccessLevel::label(member.access_level),
        expires
    );
}

/// Upsert rows derived from a remote listing, recording `project` as last seen.
pub fn cache_rows(
    project: &ProjectRef,
    members: &[ProjectMember],
    wanted: &BTreeSet<UserId>,
) -> Vec<UpsertMemberParams> {
    let project_id = match project {
        ProjectRef::Id(id) => Some(*id),
        ProjectRef::Path(_) => None,
    };

    members
        .iter()
        .filter(|m| wanted.is_empty() || wanted.contains(&m.id))
        .map(|m| UpsertMemberParams {
            user_id: m.id,
            username: m.username.clone(),
            name: m.name.clone(),
            avatar_url: m.avatar_url.clone(),
            project_id,
            project_name: Some(project.to_string()),
        })
        .collect()
}

pub async fn cmd_member_save(
    cli: &Cli,
    project: &ProjectRef,
    user_ids: &[UserId],
) -> Result<(), Box<dyn std::error::Error>> {
    let client = setup_client(cli)?;
    let store = open_store(cli).await?;

    let members = client.list_all_members(project).await?;
    let wanted: BTreeSet<UserId> = user_ids.iter().copied().collect();
    let rows = cache_rows(project, &members, &wanted);

    let found: BTreeSet<UserId> = rows.iter().map(|r| r.user_id).collect();
    for missing in wanted.difference(&found) {
        eprintln!("Warning: user {} is not a member of {}", missing, project);
    }

    if rows.is_empty() {
        println!("Nothing to save");
        return Ok(());
    }

    store.upsert_members(&rows).await?;
    println!("Saved {} member(s) from {} to the local cache", rows.len(), project);

    Ok(())
}
