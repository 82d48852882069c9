use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::document::normalize::normalize_text;
use crate::error::{DocError, DocResult};

/// Goals picked by the user, grouped by level and then by domain
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GoalSelection {
    #[serde(default)]
    pub levels: Vec<GoalLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalLevel {
    pub name: String,
    #[serde(default)]
    pub domains: Vec<GoalDomain>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalDomain {
    pub name: String,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    #[serde(default)]
    pub id: String,
    pub text: String,
    /// Rendered in bold after the long-term goal, e.g. "(Mức 2)"
    #[serde(default)]
    pub suffix: Option<String>,
}

/// Goals of one domain across all levels, numbered from 1
#[derive(Debug, Clone, PartialEq)]
pub struct DomainGroup<'a> {
    pub number: usize,
    pub name: &'a str,
    pub goals: Vec<&'a Goal>,
}

impl GoalSelection {
    pub fn from_json(json: &str) -> DocResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DocError::external(format!("invalid goal selection: {e}")))
    }

    pub fn from_toml(text: &str) -> DocResult<Self> {
        toml::from_str(text).map_err(|e| DocError::external(format!("invalid goal selection: {e}")))
    }

    /// Read a selection file, choosing the format by extension
    pub fn load(path: &Path) -> DocResult<Self> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn goal_count(&self) -> usize {
        self.levels
            .iter()
            .flat_map(|l| &l.domains)
            .map(|d| d.goals.len())
            .sum()
    }

    /// Merge same-named domains across levels, keeping first-seen order
    ///
    /// Names are compared after diacritic folding. Domains without goals are
    /// dropped.
    pub fn group_by_domain(&self) -> Vec<DomainGroup<'_>> {
        let mut groups: Vec<(String, DomainGroup<'_>)> = Vec::new();

        for domain in self.levels.iter().flat_map(|l| &l.domains) {
            if domain.goals.is_empty() {
                continue;
            }
            let key = normalize_text(&domain.name);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.goals.extend(domain.goals.iter()),
                None => {
                    let group = DomainGroup {
                        number: groups.len() + 1,
                        name: domain.name.trim(),
                        goals: domain.goals.iter().collect(),
                    };
                    groups.push((key, group));
                }
            }
        }

        groups.into_iter().map(|(_, group)| group).collect()
    }
}
