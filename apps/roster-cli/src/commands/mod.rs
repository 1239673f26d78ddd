pub mod batch;
pub mod config;
pub mod group;
pub mod local;
pub mod member;
pub mod project;

pub use batch::{cmd_batch_add, cmd_batch_remove};
pub use config::{cmd_config_set, cmd_config_show};
pub use group::{
    cmd_group_add, cmd_group_create, cmd_group_delete, cmd_group_list, cmd_group_remove,
    cmd_group_rename, cmd_group_show,
};
pub use local::{cmd_local_delete, cmd_local_list};
pub use member::{cmd_member_list, cmd_member_save};
pub use project::cmd_project_search;
