use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Kind of resource this node keeps a record of on the server.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Status,
    Asset,
    Environment,
    Motion,
    Control,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Status,
        Category::Asset,
        Category::Environment,
        Category::Motion,
        Category::Control,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Status => "status",
            Category::Asset => "asset",
            Category::Environment => "environment",
            Category::Motion => "motion",
            Category::Control => "control",
        }
    }

    /// Listing path of this category relative to the server address.
    pub fn default_path(&self) -> &'static str {
        match self {
            Category::Status => "/server/status",
            Category::Asset => "/server/asset",
            Category::Environment => "/environment",
            Category::Motion => "/motion",
            Category::Control => "/control",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Debug, Error)]
#[error("unknown category '{0}', expected one of: status, asset, environment, motion, control")]
pub struct ParseCategoryError(String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
