use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Industry grouping used for cross-brand comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandCategory {
    Technology,
    Gaming,
    Telecom,
    SocialMedia,
    Other,
}

impl std::fmt::Display for BrandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrandCategory::Technology => write!(f, "technology"),
            BrandCategory::Gaming => write!(f, "gaming"),
            BrandCategory::Telecom => write!(f, "telecom"),
            BrandCategory::SocialMedia => write!(f, "social_media"),
            BrandCategory::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    pub name: String,
    #[serde(default = "default_category")]
    pub category: BrandCategory,
    /// Alternate spellings and handles that refer to this brand.
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_category() -> BrandCategory {
    BrandCategory::Other
}

impl BrandConfig {
    /// Generate a URL-safe slug from the brand name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandsFile {
    pub brands: Vec<BrandConfig>,
}

impl BrandsFile {
    /// Find the tracked brand referred to by `mention`, matching the name or
    /// any alias case-insensitively.
    #[must_use]
    pub fn resolve(&self, mention: &str) -> Option<&BrandConfig> {
        let needle = mention.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.brands.iter().find(|b| {
            b.name.to_lowercase() == needle || b.aliases.iter().any(|a| a.to_lowercase() == needle)
        })
    }

    /// Category of the named brand; `Other` when the brand is not tracked.
    #[must_use]
    pub fn category_of(&self, name: &str) -> BrandCategory {
        self.resolve(name).map_or(BrandCategory::Other, |b| b.category)
    }
}

/// Load and validate the brands configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_brands(path: &Path) -> Result<BrandsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::BrandsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let brands_file: BrandsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::BrandsFileParse)?;

    validate_brands(&brands_file)?;

    Ok(brands_file)
}

fn validate_brands(brands_file: &BrandsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();
    let mut alias_owner: HashMap<String, &str> = HashMap::new();

    for brand in &brands_file.brands {
        if brand.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "brand name must be non-empty".to_string(),
            ));
        }

        let lower_name = brand.name.to_lowercase();
        if !seen_names.insert(lower_name.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand name: '{}'",
                brand.name
            )));
        }

        let slug = brand.slug();
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate brand slug: '{}' (from brand '{}')",
                slug, brand.name
            )));
        }

        if let Some(owner) = alias_owner.get(&lower_name) {
            return Err(ConfigError::Validation(format!(
                "brand name '{}' is already an alias of '{owner}'",
                brand.name
            )));
        }

        for alias in &brand.aliases {
            let lower_alias = alias.trim().to_lowercase();
            if lower_alias.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "brand '{}' has an empty alias",
                    brand.name
                )));
            }
            if lower_alias != lower_name && seen_names.contains(&lower_alias) {
                return Err(ConfigError::Validation(format!(
                    "alias '{alias}' of brand '{}' collides with another brand name",
                    brand.name
                )));
            }
            if let Some(owner) = alias_owner.insert(lower_alias, &brand.name) {
                if owner != brand.name {
                    return Err(ConfigError::Validation(format!(
                        "alias '{alias}' is shared by '{owner}' and '{}'",
                        brand.name
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "brands_test.rs"]
mod tests;
