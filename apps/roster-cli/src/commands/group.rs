use roster_storage::{GroupId, MembershipStore, StoreError, UserId};

use super::local::print_local_member;
use crate::cli::Cli;
use crate::context::open_store;

fn group_not_found(group_id: GroupId) -> impl FnOnce(StoreError) -> Box<dyn std::error::Error> {
    move |e| match e {
        StoreError::NotFound => format!("group {} not found", group_id).into(),
        other => other.into(),
    }
}

pub async fn cmd_group_create(cli: &Cli, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    let group = store.create_group(name).await.map_err(|e| match e {
        StoreError::AlreadyExists => format!("group '{}' already exists", name.trim()).into(),
        other => Box::<dyn std::error::Error>::from(other),
    })?;

    println!("Created group: {}", group.name);
    println!("  ID: {}", group.id);

    Ok(())
}

pub async fn cmd_group_list(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    let groups = store.list_groups().await?;

    if groups.is_empty() {
        println!("No groups found");
        return Ok(());
    }

    println!("Groups:");
    for group in groups {
        println!(
            "  {:>4}  {} ({} member{})",
            group.id,
            group.name,
            group.members_count,
            if group.members_count == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

pub async fn cmd_group_rename(
    cli: &Cli,
    group_id: GroupId,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    store
        .rename_group(&group_id, name)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => format!("group '{}' already exists", name.trim()).into(),
            other => group_not_found(group_id)(other),
        })?;

    println!("Group {} renamed to '{}'", group_id, name.trim());

    Ok(())
}

pub async fn cmd_group_delete(cli: &Cli, group_id: GroupId) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    store
        .delete_group(&group_id)
        .await
        .map_err(group_not_found(group_id))?;

    println!("Group {} deleted", group_id);

    Ok(())
}

pub async fn cmd_group_show(cli: &Cli, group_id: GroupId) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    let group = store
        .get_group(&group_id)
        .await
        .map_err(group_not_found(group_id))?;
    let members = store.list_group_members(&group_id).await?;

    println!("Group: {}", group.name);
    println!("  ID: {}", group.id);
    println!("  Created: {}", group.created_at.to_rfc3339());
    if members.is_empty() {
        println!("  No members");
    } else {
        println!("  Members:");
        for member in &members {
            print_local_member(member);
        }
    }

    Ok(())
}

pub async fn cmd_group_add(
    cli: &Cli,
    group_id: GroupId,
    user_ids: &[UserId],
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    store
        .add_to_group(&group_id, user_ids)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => format!(
                "group {} not found, or a user is not in the local cache (run 'roster member save' first)",
                group_id
            )
            .into(),
            other => Box::<dyn std::error::Error>::from(other),
        })?;

    println!("Added {} user(s) to group {}", user_ids.len(), group_id);

    Ok(())
}

pub async fn cmd_group_remove(
    cli: &Cli,
    group_id: GroupId,
    user_ids: &[UserId],
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    store
        .remove_from_group(&group_id, user_ids)
        .await
        .map_err(group_not_found(group_id))?;

    println!("Removed {} user(s) from group {}", user_ids.len(), group_id);

    Ok(())
}
