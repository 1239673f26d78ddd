use roster_storage::{LocalMember, MemberFilter, MembershipStore, UserId};

use crate::cli::Cli;
use crate::context::open_store;

pub async fn cmd_local_list(
    cli: &Cli,
    query: Option<&str>,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    let filter = MemberFilter {
        limit,
        ..MemberFilter::matching(query.unwrap_or_default())
    };
    let members = store.list_members(&filter).await?;

    if members.is_empty() {
        println!("No cached members found");
        return Ok(());
    }

    println!("Cached members:");
    for member in &members {
        print_local_member(member);
    }

    Ok(())
}

pub fn print_local_member(member: &LocalMember) {
    let seen_in = member
        .project_name
        .as_deref()
        .map(|p| format!("  (last seen in {})", p))
        .unwrap_or_default();
    println!(
        "  {:>8}  {:<24} {}{}",
        member.user_id, member.username, member.name, seen_in
    );
}

pub async fn cmd_local_delete(
    cli: &Cli,
    user_ids: &[UserId],
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(cli).await?;

    let deleted = store.delete_members(user_ids).await?;

    println!("Deleted {} cached member(s)", deleted);

    Ok(())
}
