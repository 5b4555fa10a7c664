//! Analysis settings.
//!
//! Settings are loaded from a YAML file (`tutorlint.yaml`, auto-discovered
//! in the working directory) and carry the course-specific knobs: which
//! categories run, the expected entry-point name, discouraged commands,
//! and rule codes to suppress.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::violations::{Category, CATEGORY_ORDER};

/// Default settings file names to search for.
pub const DEFAULT_SETTINGS_NAMES: &[&str] = &["tutorlint.yaml", ".tutorlint.yaml"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Categories to run, in the canonical order. Empty means all.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Conventional entry-point function name.
    #[serde(default = "default_main_function")]
    pub main_function: String,
    /// Commands whose use is flagged (PT1).
    #[serde(default = "default_discouraged_commands")]
    pub discouraged_commands: Vec<String>,
    /// Method names allowed inside classes without a nesting complaint.
    #[serde(default = "default_allowed_methods")]
    pub allowed_method_names: Vec<String>,
    /// Functions allowed to end without a return statement.
    #[serde(default = "default_allowed_methods")]
    pub missing_return_allowed: Vec<String>,
    /// Keywords expected in the file's header comments (MR5).
    #[serde(default = "default_header_keywords")]
    pub header_keywords: Vec<String>,
    /// How many leading lines the header check inspects.
    #[serde(default = "default_header_lines")]
    pub header_lines: usize,
    /// Rule codes to suppress entirely.
    #[serde(default)]
    pub ignored_checks: Vec<String>,
}

fn default_main_function() -> String {
    "main".to_string()
}

fn default_discouraged_commands() -> Vec<String> {
    ["exec", "eval", "globals", "locals"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_methods() -> Vec<String> {
    vec!["__init__".to_string()]
}

fn default_header_keywords() -> Vec<String> {
    vec!["Author".to_string(), "Date".to_string()]
}

fn default_header_lines() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            main_function: default_main_function(),
            discouraged_commands: default_discouraged_commands(),
            allowed_method_names: default_allowed_methods(),
            missing_return_allowed: default_allowed_methods(),
            header_keywords: default_header_keywords(),
            header_lines: default_header_lines(),
            ignored_checks: Vec::new(),
        }
    }
}

impl Settings {
    /// Parse settings from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Look for a settings file in the working directory. Falls back to
    /// defaults when none exists.
    pub fn discover() -> anyhow::Result<Self> {
        for name in DEFAULT_SETTINGS_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::parse_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// The selected categories in canonical execution order.
    pub fn selected_categories(&self) -> Vec<Category> {
        if self.categories.is_empty() {
            return CATEGORY_ORDER.to_vec();
        }
        CATEGORY_ORDER
            .iter()
            .copied()
            .filter(|c| self.categories.iter().any(|s| s == c.as_str()))
            .collect()
    }

    /// The default settings file content written by `tutorlint init`.
    pub fn template() -> String {
        serde_yaml::to_string(&Settings::default()).unwrap_or_default()
    }
}
