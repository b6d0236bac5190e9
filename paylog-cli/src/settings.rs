//! Settings file and roster loading for the CLI.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use paylog_core::{EmployeeProfile, Page};

/// Persistent CLI configuration, merged with command-line flags.
///
/// Every field has a default so an absent file or an empty one is valid.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    pub roster_path: Option<PathBuf>,
    pub page_size: u32,
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("paylog.db"),
            roster_path: None,
            page_size: Page::DEFAULT_SIZE,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or the defaults when no file was named.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing settings file {}", path.display()))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RosterFile {
    #[serde(default, rename = "employee")]
    employees: Vec<RosterEmployee>,
}

#[derive(Debug, Deserialize)]
struct RosterEmployee {
    id: String,
    name: String,
    #[serde(default)]
    department: Option<String>,
}

/// Read employee profiles from a TOML roster file.
///
/// The file holds an `[[employee]]` table per person with `id`, `name`, and
/// an optional `department`.
pub fn load_roster(path: &Path) -> Result<Vec<EmployeeProfile>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading roster file {}", path.display()))?;
    let file: RosterFile =
        toml::from_str(&raw).with_context(|| format!("parsing roster file {}", path.display()))?;
    Ok(file
        .employees
        .into_iter()
        .map(|employee| {
            let profile = EmployeeProfile::new(employee.id, employee.name);
            match employee.department {
                Some(department) => profile.with_department(department),
                None => profile,
            }
        })
        .collect())
}
