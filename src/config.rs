use crate::error::{FleetError, Result};
use crate::model::{ForkBound, RepoDescriptor, MONTH_COLUMN};
use crate::util::parse_bound_date;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/repo_config.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub repo: RepoDescriptor,
    pub bound: ForkBound,
}

/// Repository location → lower bound, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FleetConfig {
    pub entries: Vec<RepoEntry>,
}

impl FleetConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            FleetError::MalformedConfiguration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_json(&text)?;
        log::info!(
            "loaded config for {} repositories from {}",
            config.entries.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(text)
            .map_err(|e| FleetError::MalformedConfiguration(format!("invalid JSON: {e}")))?;

        let mut config = Self::default();
        for (location, value) in map {
            let bound = match &value {
                Value::Null => ForkBound::Unbounded,
                Value::String(s) => ForkBound::Since(parse_bound_date(s).map_err(|e| {
                    FleetError::MalformedConfiguration(format!("{location}: {e}"))
                })?),
                other => {
                    return Err(FleetError::MalformedConfiguration(format!(
                        "{location}: expected a date string or null, found {other}"
                    )))
                }
            };
            config.push(RepoDescriptor::from_path(&location), bound);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn push(&mut self, repo: RepoDescriptor, bound: ForkBound) {
        self.entries.push(RepoEntry { repo, bound });
    }

    /// Ids must be unique and must not shadow the month column.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let id = entry.repo.id.as_str();
            if id == MONTH_COLUMN {
                return Err(FleetError::MalformedConfiguration(format!(
                    "repository id '{id}' collides with the month column"
                )));
            }
            if !seen.insert(id) {
                return Err(FleetError::MalformedConfiguration(format!(
                    "duplicate repository id '{id}' ({})",
                    entry.repo.path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn repos(&self) -> impl Iterator<Item = &RepoDescriptor> {
        self.entries.iter().map(|e| &e.repo)
    }

    pub fn to_json(&self) -> Result<String> {
        let mut map = Map::new();
        for entry in &self.entries {
            let value = match entry.bound {
                ForkBound::Since(date) => Value::String(date.format("%Y-%m-%d").to_string()),
                ForkBound::Unbounded => Value::Null,
            };
            map.insert(entry.repo.path.to_string_lossy().to_string(), value);
        }
        Ok(serde_json::to_string_pretty(&map)?)
    }

    pub fn store<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()? + "\n")?;
        Ok(())
    }
}
