use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Version written into freshly created profiles.
pub const DEFAULT_PROFILE_VERSION: &str = "1.0.0";
/// Platform version written into freshly created profiles.
pub const DEFAULT_PLATFORM_VERSION: &str = "v0.3.43";
pub const DEFAULT_AUTHOR: &str = "User";
pub const DEFAULT_LICENSE: &str = "MIT";
pub const DEFAULT_TIMESTAMP: &str = "2024-01-01";
pub const DEFAULT_TAG: &str = "custom";

/// Contents of a profile's `profile.yaml`.
///
/// Every field is optional on disk. Collections that are missing or explicitly
/// `null` come back empty; no required-field checks happen at this level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    #[serde(deserialize_with = "deserialize_null_default")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub version: String,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub description: String,

    /// Parent profiles, in declaration order.
    /// Accepts a single name or a list of names.
    #[serde(deserialize_with = "deserialize_name_list")]
    pub extends: Vec<String>,

    #[serde(deserialize_with = "deserialize_name_list")]
    pub tags: Vec<String>,

    /// Target platform version the profile was written against
    #[serde(rename = "comfyui_version", deserialize_with = "deserialize_null_default")]
    pub platform_version: String,

    /// Constraint strings keyed by requirement (python, gpu, storage, ...)
    #[serde(deserialize_with = "deserialize_null_default")]
    pub requirements: BTreeMap<String, String>,

    #[serde(deserialize_with = "deserialize_null_default")]
    pub author: String,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub license: String,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub created: String,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub updated: String,

    #[serde(deserialize_with = "deserialize_null_default")]
    pub models: Vec<Value>,

    #[serde(deserialize_with = "deserialize_null_default")]
    pub extensions: ProfileExtensions,

    /// Top-level keys without a typed field, kept as written.
    /// Filled by [`ProfileConfig::keep_unknown_keys`], not by `Deserialize`.
    #[serde(flatten, skip_deserializing)]
    pub extra: BTreeMap<String, Value>,
}

/// Top-level keys that map onto typed `ProfileConfig` fields
const KNOWN_KEYS: [&str; 13] = [
    "name",
    "version",
    "description",
    "extends",
    "tags",
    "comfyui_version",
    "requirements",
    "author",
    "license",
    "created",
    "updated",
    "models",
    "extensions",
];

/// Extension descriptors, kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileExtensions {
    #[serde(deserialize_with = "deserialize_null_default")]
    pub git: Vec<Value>,
    #[serde(deserialize_with = "deserialize_null_default")]
    pub pip: Vec<Value>,
}

impl ProfileConfig {
    /// Default configuration written by profile creation.
    pub fn scaffold(name: &str, extends: &[String]) -> Self {
        let requirements = [("python", ">=3.10"), ("gpu", ">=4GB"), ("storage", ">=20GB")]
            .into_iter()
            .map(|(key, constraint)| (key.to_string(), constraint.to_string()))
            .collect();

        Self {
            name: name.to_string(),
            version: DEFAULT_PROFILE_VERSION.to_string(),
            description: format!("Custom profile: {name}"),
            extends: extends.to_vec(),
            tags: vec![DEFAULT_TAG.to_string()],
            platform_version: DEFAULT_PLATFORM_VERSION.to_string(),
            requirements,
            author: DEFAULT_AUTHOR.to_string(),
            license: DEFAULT_LICENSE.to_string(),
            created: DEFAULT_TIMESTAMP.to_string(),
            updated: DEFAULT_TIMESTAMP.to_string(),
            models: Vec::new(),
            extensions: ProfileExtensions::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Copy every top-level key of `document` that has no typed field into
    /// `extra`. Keys that are not strings, or values JSON cannot hold, are
    /// skipped with a warning.
    pub fn keep_unknown_keys(&mut self, document: serde_yaml_ng::Mapping) {
        for (key, value) in document {
            let Some(key) = key.as_str().map(str::to_string) else {
                tracing::warn!("Skipping non-string top-level key {:?}", key);
                continue;
            };
            if KNOWN_KEYS.contains(&key.as_str()) {
                continue;
            }

            match serde_json::to_value(&value) {
                Ok(value) => {
                    self.extra.insert(key, value);
                }
                Err(e) => tracing::warn!("Skipping top-level key '{}': {}", key, e),
            }
        }
    }
}

/// Treat an explicit `null` the same as a missing field
fn deserialize_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Custom deserializer to support both a single name and a list of names
fn deserialize_name_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NameList {
        Single(String),
        Multiple(Vec<String>),
    }

    Ok(match Option::<NameList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(NameList::Single(name)) => vec![name],
        Some(NameList::Multiple(names)) => names,
    })
}

/// One loaded profile in a listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEntry {
    pub name: String,
    pub config: ProfileConfig,
}

/// A profile that could not be loaded during a batch operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDiagnostic {
    pub name: String,
    pub message: String,
}

/// Result of listing the store: everything that loaded, plus what didn't.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileListing {
    pub profiles: Vec<ProfileEntry>,
    pub diagnostics: Vec<ProfileDiagnostic>,
}

/// An `extends` edge that pointed back onto the current resolution path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyCycle {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    /// Transitive closure of `extends`, including the root profile
    pub profiles: BTreeSet<String>,
    pub cycles: Vec<DependencyCycle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub profile_name: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn new(profile_name: &str, errors: Vec<String>) -> Self {
        Self {
            profile_name: profile_name.to_string(),
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Everything known about a single profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDetails {
    pub profile_name: String,
    pub config: ProfileConfig,
    pub dependencies: Vec<String>,
    pub cycles: Vec<DependencyCycle>,
    pub valid: bool,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_default_to_empty() {
        let config: ProfileConfig = serde_yaml_ng::from_str("name: bare\n").expect("parse");

        assert_eq!(config.name, "bare");
        assert!(config.extends.is_empty());
        assert!(config.tags.is_empty());
        assert!(config.requirements.is_empty());
        assert!(config.models.is_empty());
        assert_eq!(config.extensions, ProfileExtensions::default());
    }

    #[test]
    fn null_collections_are_empty() {
        let yaml = "name: nulls\nextends:\nmodels: ~\nextensions:\n  git:\n  pip: []\n";
        let config: ProfileConfig = serde_yaml_ng::from_str(yaml).expect("parse");

        assert!(config.extends.is_empty());
        assert!(config.models.is_empty());
        assert!(config.extensions.git.is_empty());
    }

    #[test]
    fn null_scalars_are_empty() {
        let config: ProfileConfig =
            serde_yaml_ng::from_str("name: ~\nversion: null\nauthor:\n").expect("parse");

        assert_eq!(config.name, "");
        assert_eq!(config.version, "");
        assert_eq!(config.author, "");
    }

    #[test]
    fn unknown_keys_are_kept_verbatim() {
        let yaml = "name: u\nworkflows_meta: [a, b]\nhomepage: x\n";
        let mut config: ProfileConfig = serde_yaml_ng::from_str(yaml).expect("parse");
        let document: serde_yaml_ng::Mapping = serde_yaml_ng::from_str(yaml).expect("parse");

        config.keep_unknown_keys(document);

        assert_eq!(config.extra.len(), 2);
        let json = serde_json::to_value(&config).expect("serialize");
        assert_eq!(json["name"], "u");
        assert_eq!(json["homepage"], "x");
        assert_eq!(json["workflows_meta"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn single_extends_is_a_list_of_one() {
        let config: ProfileConfig =
            serde_yaml_ng::from_str("name: child\nextends: base\n").expect("parse");

        assert_eq!(config.extends, vec!["base".to_string()]);
    }

    #[test]
    fn numeric_constraints_read_as_strings() {
        let yaml = "version: 1.0\nrequirements:\n  python: 3.10\n  gpu: '>=8GB'\n";
        let config: ProfileConfig = serde_yaml_ng::from_str(yaml).expect("parse");

        assert_eq!(config.version, "1.0");
        assert_eq!(config.requirements.get("python").map(String::as_str), Some("3.10"));
        assert_eq!(config.requirements.get("gpu").map(String::as_str), Some(">=8GB"));
    }

    #[test]
    fn models_and_extensions_stay_opaque() {
        let yaml = r#"
models:
  - name: sdxl
    type: checkpoint
    url: https://example.com/sdxl.safetensors
extensions:
  git:
    - name: manager
      url: https://example.com/manager.git
      branch: main
  pip:
    - name: torch
      version: "2.1"
"#;
        let config: ProfileConfig = serde_yaml_ng::from_str(yaml).expect("parse");

        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0]["type"], "checkpoint");
        assert_eq!(config.extensions.git[0]["branch"], "main");
        assert_eq!(config.extensions.pip[0]["version"], "2.1");
    }

    #[test]
    fn scaffold_uses_fixed_defaults() {
        let config = ProfileConfig::scaffold("video", &["base".to_string()]);

        assert_eq!(config.name, "video");
        assert_eq!(config.description, "Custom profile: video");
        assert_eq!(config.extends, vec!["base".to_string()]);
        assert_eq!(config.tags, vec![DEFAULT_TAG.to_string()]);
        assert_eq!(config.platform_version, DEFAULT_PLATFORM_VERSION);
        assert_eq!(config.requirements.len(), 3);
        assert_eq!(config.created, DEFAULT_TIMESTAMP);
    }

    #[test]
    fn report_is_valid_without_errors() {
        assert!(ValidationReport::new("a", Vec::new()).valid);
        assert!(!ValidationReport::new("a", vec!["bad".to_string()]).valid);
    }
}
