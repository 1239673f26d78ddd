mod cli;
mod commands;
mod config;
mod context;

use clap::Parser;
use cli::{BatchCommand, Cli, Command, ConfigCommand, GroupCommand, LocalCommand, MemberCommand, ProjectCommand};
use commands::*;
use roster_storage::GroupId;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Config { config_cmd } => match config_cmd {
            ConfigCommand::Set {
                base_url,
                token,
                timeout_secs,
            } => {
                cmd_config_set(&cli, base_url, token, *timeout_secs)?;
            }
            ConfigCommand::Show => {
                cmd_config_show(&cli)?;
            }
        },
        Command::Project { project_cmd } => match project_cmd {
            ProjectCommand::Search { keyword, paging } => {
                cmd_project_search(&cli, keyword, paging).await?;
            }
        },
        Command::Member { member_cmd } => match member_cmd {
            MemberCommand::List { project, paging } => {
                cmd_member_list(&cli, project.as_ref(), paging).await?;
            }
            MemberCommand::Save { project, user_ids } => {
                cmd_member_save(&cli, project, user_ids).await?;
            }
        },
        Command::Local { local_cmd } => match local_cmd {
            LocalCommand::List { query, limit } => {
                cmd_local_list(&cli, query.as_deref(), *limit).await?;
            }
            LocalCommand::Delete { user_ids } => {
                cmd_local_delete(&cli, user_ids).await?;
            }
        },
        Command::Group { group_cmd } => match group_cmd {
            GroupCommand::Create { name } => {
                cmd_group_create(&cli, name).await?;
            }
            GroupCommand::List => {
                cmd_group_list(&cli).await?;
            }
            GroupCommand::Rename { group_id, name } => {
                cmd_group_rename(&cli, GroupId(*group_id), name).await?;
            }
            GroupCommand::Delete { group_id } => {
                cmd_group_delete(&cli, GroupId(*group_id)).await?;
            }
            GroupCommand::Show { group_id } => {
                cmd_group_show(&cli, GroupId(*group_id)).await?;
            }
            GroupCommand::Add { group_id, user_ids } => {
                cmd_group_add(&cli, GroupId(*group_id), user_ids).await?;
            }
            GroupCommand::Remove { group_id, user_ids } => {
                cmd_group_remove(&cli, GroupId(*group_id), user_ids).await?;
            }
        },
        Command::Batch { batch_cmd } => match batch_cmd {
            BatchCommand::Add {
                project,
                targets,
                access_level,
                expires_at,
            } => {
                cmd_batch_add(&cli, project.as_ref(), targets, *access_level, *expires_at).await?;
            }
            BatchCommand::Remove {
                project,
                targets,
                yes,
            } => {
                cmd_batch_remove(&cli, project.as_ref(), targets, *yes).await?;
            }
        },
    }

    Ok(())
}
