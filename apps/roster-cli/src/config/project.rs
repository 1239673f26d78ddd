use roster_remote::{AccessLevel, ProjectRef};
use roster_storage::GroupId;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub defaults: ProjectDefaults,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProjectDefaults {
    pub project: Option<String>,
    pub access_level: Option<String>,
    pub group: Option<i64>,
}

const CANDIDATES: [(&str, &str); 4] = [
    ("roster.toml", "toml"),
    ("roster.yaml", "yaml"),
    ("roster.yml", "yaml"),
    ("roster.json", "json"),
];

pub fn find_project_config() -> Option<ProjectConfig> {
    let current_dir = std::env::current_dir().ok()?;
    find_project_config_from(&current_dir)
}

/// Walk up from `start`; the first parseable roster.{toml,yaml,yml,json} wins.
pub fn find_project_config_from(start: &Path) -> Option<ProjectConfig> {
    let mut current_dir = start.to_path_buf();

    loop {
        for (filename, format) in CANDIDATES {
            let config_path = current_dir.join(filename);
            if let Ok(content) = std::fs::read_to_string(&config_path) {
                let config_result: Result<ProjectConfig, Box<dyn std::error::Error>> = match format
                {
                    "toml" => toml::from_str::<ProjectConfig>(&content).map_err(|e| e.into()),
                    "yaml" => serde_yaml::from_str::<ProjectConfig>(&content).map_err(|e| e.into()),
                    "json" => serde_json::from_str::<ProjectConfig>(&content).map_err(|e| e.into()),
                    _ => continue,
                };
                match config_result {
                    Ok(config) => return Some(config),
                    Err(e) => tracing::debug!(path = %config_path.display(), error = %e, "skipping unparseable project config"),
                }
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

pub fn resolve_project(
    project_arg: Option<&ProjectRef>,
) -> Result<ProjectRef, Box<dyn std::error::Error>> {
    resolve_project_with(project_arg, find_project_config().as_ref())
}

fn resolve_project_with(
    project_arg: Option<&ProjectRef>,
    config: Option<&ProjectConfig>,
) -> Result<ProjectRef, Box<dyn std::error::Error>> {
    if let Some(project) = project_arg {
        return Ok(project.clone());
    }
    let project = config
        .and_then(|c| c.defaults.project.as_deref())
        .ok_or("project not specified (pass it as an argument or set defaults.project in roster.toml)")?;
    Ok(project.parse()?)
}

pub fn resolve_access_level(
    level_arg: Option<AccessLevel>,
) -> Result<AccessLevel, Box<dyn std::error::Error>> {
    resolve_access_level_with(level_arg, find_project_config().as_ref())
}

fn resolve_access_level_with(
    level_arg: Option<AccessLevel>,
    config: Option<&ProjectConfig>,
) -> Result<AccessLevel, Box<dyn std::error::Error>> {
    if let Some(level) = level_arg {
        return Ok(level);
    }
    let level = config
        .and_then(|c| c.defaults.access_level.as_deref())
        .ok_or("access level not specified (use --access-level or set defaults.access_level in roster.toml)")?;
    Ok(level.parse::<AccessLevel>()?)
}

pub fn resolve_group(group_arg: Option<i64>) -> Option<GroupId> {
    group_arg
        .or_else(|| find_project_config().and_then(|c| c.defaults.group))
        .map(GroupId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_toml_in_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("roster.toml"),
            "[defaults]\nproject = \"platform/api\"\naccess_level = \"reporter\"\ngroup = 4\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let config = find_project_config_from(&nested).unwrap();
        assert_eq!(config.defaults.project.as_deref(), Some("platform/api"));
        assert_eq!(config.defaults.access_level.as_deref(), Some("reporter"));
        assert_eq!(config.defaults.group, Some(4));
    }

    #[test]
    fn reads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("roster.yaml"),
            "defaults:\n  project: \"42\"\n",
        )
        .unwrap();
        let config = find_project_config_from(dir.path()).unwrap();
        assert_eq!(config.defaults.project.as_deref(), Some("42"));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("roster.json"),
            r#"{"defaults":{"access_level":"30"}}"#,
        )
        .unwrap();
        let config = find_project_config_from(dir.path()).unwrap();
        assert_eq!(config.defaults.access_level.as_deref(), Some("30"));
    }

    #[test]
    fn argument_beats_config() {
        let config = ProjectConfig {
            defaults: ProjectDefaults {
                project: Some("platform/api".into()),
                access_level: Some("guest".into()),
                group: None,
            },
        };

        let explicit = ProjectRef::Id(9);
        assert_eq!(
            resolve_project_with(Some(&explicit), Some(&config)).unwrap(),
            ProjectRef::Id(9)
        );
        assert_eq!(
            resolve_project_with(None, Some(&config)).unwrap(),
            ProjectRef::Path("platform/api".into())
        );
        assert_eq!(
            resolve_access_level_with(None, Some(&config)).unwrap(),
            AccessLevel::Guest
        );
        assert_eq!(
            resolve_access_level_with(Some(AccessLevel::Owner), Some(&config)).unwrap(),
            AccessLevel::Owner
        );
    }

    #[test]
    fn missing_defaults_are_errors() {
        assert!(resolve_project_with(None, None).is_err());
        assert!(resolve_access_level_with(None, Some(&ProjectConfig::default())).is_err());
    }
}
