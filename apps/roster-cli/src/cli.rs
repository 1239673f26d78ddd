use clap::{Args, Parser, Subcommand};
use roster_remote::{AccessLevel, ExpiresAt, ProjectRef};
use roster_storage::UserId;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Batch project membership management for GitLab")]
pub struct Cli {
    /// GitLab base URL (overrides the config file)
    #[arg(long, env = "ROSTER_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Personal access token (overrides the config file)
    #[arg(long, env = "ROSTER_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Path to the settings file (default: ~/.roster/config.json)
    #[arg(long, env = "ROSTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Local cache database URL (default: sqlite://~/.roster/cache.db)
    #[arg(long, env = "ROSTER_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connection settings
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommand,
    },
    /// Remote project commands
    Project {
        #[command(subcommand)]
        project_cmd: ProjectCommand,
    },
    /// Remote project member commands
    Member {
        #[command(subcommand)]
        member_cmd: MemberCommand,
    },
    /// Locally cached members
    Local {
        #[command(subcommand)]
        local_cmd: LocalCommand,
    },
    /// Local groups of cached members
    Group {
        #[command(subcommand)]
        group_cmd: GroupCommand,
    },
    /// Apply one membership change to many users
    Batch {
        #[command(subcommand)]
        batch_cmd: BatchCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Save base URL and token
    Set {
        /// GitLab base URL, e.g. https://gitlab.example.com
        base_url: String,
        /// Personal access token with the api scope
        token: String,
        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show the saved settings (token masked)
    Show,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Search projects by keyword
    Search {
        /// Keyword matched against project name and path
        keyword: String,
        #[command(flatten)]
        paging: Paging,
    },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// List a project's members, including inherited ones
    List {
        /// Project ID or path (defaults.project in roster.toml)
        project: Option<ProjectRef>,
        #[command(flatten)]
        paging: Paging,
    },
    /// Copy project members into the local cache
    Save {
        /// Project ID or path
        project: ProjectRef,
        /// User IDs to save (all members when omitted)
        user_ids: Vec<UserId>,
    },
}

#[derive(Subcommand)]
pub enum LocalCommand {
    /// List cached members, newest first
    List {
        /// Filter by username or name
        #[arg(short, long)]
        query: Option<String>,
        /// Maximum rows
        #[arg(short, long, default_value_t = roster_storage::DEFAULT_MEMBER_LIMIT)]
        limit: u32,
    },
    /// Delete cached members (also removes them from every group)
    Delete {
        #[arg(required = true)]
        user_ids: Vec<UserId>,
    },
}

#[derive(Subcommand)]
pub enum GroupCommand {
    /// Create an empty group
    Create { name: String },
    /// List groups with member counts
    List,
    /// Rename a group
    Rename { group_id: i64, name: String },
    /// Delete a group (cached members are kept)
    Delete { group_id: i64 },
    /// Show a group's members
    Show { group_id: i64 },
    /// Add cached members to a group
    Add {
        group_id: i64,
        #[arg(required = true)]
        user_ids: Vec<UserId>,
    },
    /// Remove members from a group
    Remove {
        group_id: i64,
        #[arg(required = true)]
        user_ids: Vec<UserId>,
    },
}

#[derive(Subcommand)]
pub enum BatchCommand {
    /// Add users to a project, one at a time
    Add {
        /// Project ID or path (defaults.project in roster.toml)
        project: Option<ProjectRef>,
        #[command(flatten)]
        targets: TargetArgs,
        /// guest, reporter, developer, maintainer, owner or 10..50
        /// (defaults.access_level in roster.toml)
        #[arg(short, long)]
        access_level: Option<AccessLevel>,
        /// Membership expiry (YYYY-MM-DD)
        #[arg(short, long)]
        expires_at: Option<ExpiresAt>,
    },
    /// Remove users from a project
    Remove {
        /// Project ID or path (defaults.project in roster.toml)
        project: Option<ProjectRef>,
        #[command(flatten)]
        targets: TargetArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Explicit user IDs
    #[arg(short, long, num_args = 1.., conflicts_with = "group")]
    pub users: Vec<UserId>,
    /// Local group ID (defaults.group in roster.toml)
    #[arg(short, long)]
    pub group: Option<i64>,
}

#[derive(Args)]
pub struct Paging {
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Items per page (max 100)
    #[arg(long, default_value_t = 20)]
    pub per_page: u32,
}
