use std::{
    collections::{BTreeSet, HashSet},
    fs, io,
    path::{Path, PathBuf},
};

use serde_yaml_ng as serde_yaml;

use super::{
    error::ProfileError,
    types::{
        DependencyCycle, ProfileConfig, ProfileDetails, ProfileDiagnostic, ProfileEntry,
        ProfileListing, Resolution, ValidationReport,
    },
};

/// Configuration file every profile directory must contain
pub const PROFILE_CONFIG_FILE: &str = "profile.yaml";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const WORKFLOWS_DIR: &str = "workflows";

const REQUIRED_FILES: [&str; 1] = [PROFILE_CONFIG_FILE];

/// File-backed store of profiles, one directory per profile under `root`.
///
/// The store keeps no state besides its root path: every call goes back to
/// disk, so a single instance can be shared freely between request handlers.
/// Calls for the same profile name are not serialized here; callers that
/// need create to be exclusive with reads must lock per name themselves.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Open the store at `root`, creating the directory if it is missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let root = root.into();

        if !root.is_dir() {
            tracing::warn!("Profiles directory {:?} does not exist, creating it", root);
            fs::create_dir_all(&root).map_err(|e| ProfileError::io(&root, e))?;
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn profile_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Read and parse `<root>/<name>/profile.yaml`.
    pub fn load_config(&self, name: &str) -> Result<ProfileConfig, ProfileError> {
        check_name(name)?;

        let path = self.profile_dir(name).join(PROFILE_CONFIG_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ProfileError::NotFound {
                    name: name.to_string(),
                    path,
                });
            }
            Err(e) => return Err(ProfileError::io(path, e)),
        };

        // Syntax first, so a shape mismatch is never reported as bad YAML
        let document: serde_yaml::Value =
            serde_yaml::from_str(&content).map_err(|source| ProfileError::Parse {
                path: path.clone(),
                source,
            })?;
        let mut config: ProfileConfig = serde_yaml::from_str(&content)
            .map_err(|source| ProfileError::Schema { path, source })?;
        if let serde_yaml::Value::Mapping(mapping) = document {
            config.keep_unknown_keys(mapping);
        }

        tracing::debug!("Loaded profile config: {}", name);
        Ok(config)
    }

    /// Transitive closure of `extends` for `name`, including `name` itself.
    pub fn resolve_dependencies(&self, name: &str) -> Result<BTreeSet<String>, ProfileError> {
        self.resolve(name).map(|resolution| resolution.profiles)
    }

    /// Resolve `name` and also report every cycle that was cut.
    ///
    /// Any dependency that fails to load fails the whole resolution with that
    /// dependency's error.
    pub fn resolve(&self, name: &str) -> Result<Resolution, ProfileError> {
        let mut resolution = Resolution::default();
        let mut on_path = HashSet::new();

        self.resolve_into(name, &mut on_path, &mut resolution)?;

        tracing::info!(
            "Resolved dependencies for {}: {:?}",
            name,
            resolution.profiles
        );
        Ok(resolution)
    }

    fn resolve_into(
        &self,
        name: &str,
        on_path: &mut HashSet<String>,
        resolution: &mut Resolution,
    ) -> Result<(), ProfileError> {
        let config = self.load_config(name)?;
        on_path.insert(name.to_string());

        for dependency in &config.extends {
            if on_path.contains(dependency) {
                tracing::warn!("Circular dependency detected: {} -> {}", name, dependency);
                resolution.cycles.push(DependencyCycle {
                    from: name.to_string(),
                    to: dependency.clone(),
                });
                continue;
            }

            // Closure already merged through another branch
            if resolution.profiles.contains(dependency) {
                continue;
            }

            self.resolve_into(dependency, on_path, resolution)?;
        }

        on_path.remove(name);
        resolution.profiles.insert(name.to_string());
        Ok(())
    }

    /// Load every profile directory under the root.
    ///
    /// Profiles that fail to load are reported in `diagnostics` instead of
    /// failing the listing.
    pub fn list_profiles(&self) -> ProfileListing {
        let mut listing = ProfileListing::default();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return listing,
            Err(e) => {
                tracing::error!("Failed to read profiles directory {:?}: {}", self.root, e);
                listing.diagnostics.push(ProfileDiagnostic {
                    name: self.root.display().to_string(),
                    message: format!("Failed to read profiles directory: {e}"),
                });
                return listing;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || !path.join(PROFILE_CONFIG_FILE).exists() {
                continue;
            }

            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!("Skipping non UTF-8 profile directory: {}", path.display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            match self.load_config(&name) {
                Ok(config) => listing.profiles.push(ProfileEntry { name, config }),
                Err(e) => {
                    tracing::error!("Error loading profile {}: {}", name, e);
                    listing.diagnostics.push(ProfileDiagnostic {
                        name,
                        message: e.to_string(),
                    });
                }
            }
        }

        listing
    }

    /// Structural check of a profile. An empty result means valid.
    pub fn validate(&self, name: &str) -> Vec<String> {
        self.validate_and_resolve(name).0
    }

    pub fn validation_report(&self, name: &str) -> ValidationReport {
        ValidationReport::new(name, self.validate(name))
    }

    fn validate_and_resolve(&self, name: &str) -> (Vec<String>, Option<Resolution>) {
        if let Err(e) = check_name(name) {
            return (vec![e.to_string()], None);
        }

        let profile_dir = self.profile_dir(name);
        if !profile_dir.is_dir() {
            let error = format!("Profile directory does not exist: {}", profile_dir.display());
            return (vec![error], None);
        }

        let mut errors: Vec<String> = REQUIRED_FILES
            .iter()
            .filter(|file| !profile_dir.join(file).is_file())
            .map(|file| format!("Missing required file: {file}"))
            .collect();

        errors.extend(check_yaml_syntax(&profile_dir));

        if let Err(ProfileError::Schema { source, .. }) = self.load_config(name) {
            errors.push(format!("Invalid structure in {PROFILE_CONFIG_FILE}: {source}"));
        }

        let resolution = match self.resolve(name) {
            Ok(resolution) => Some(resolution),
            Err(e) => {
                errors.push(format!("Dependency resolution failed: {e}"));
                None
            }
        };

        (errors, resolution)
    }

    /// Config, resolved dependencies and validation result in one go.
    ///
    /// Only a failure to load the profile's own config is an error; a broken
    /// dependency graph is reported through `errors`.
    pub fn profile_details(&self, name: &str) -> Result<ProfileDetails, ProfileError> {
        let config = self.load_config(name)?;
        let (errors, resolution) = self.validate_and_resolve(name);
        let resolution = resolution.unwrap_or_default();

        Ok(ProfileDetails {
            profile_name: name.to_string(),
            config,
            dependencies: resolution.profiles.into_iter().collect(),
            cycles: resolution.cycles,
            valid: errors.is_empty(),
            errors,
        })
    }

    /// Create a new profile, logging instead of returning the failure.
    pub fn create_profile(&self, name: &str, extends: &[String]) -> bool {
        match self.try_create_profile(name, extends) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error creating profile {}: {}", name, e);
                false
            }
        }
    }

    /// Create `<root>/<name>` with a default config, a requirements
    /// placeholder and an empty workflows directory.
    ///
    /// Never overwrites an existing profile. There is no rollback: if a step
    /// after the directory creation fails, the partial directory remains.
    pub fn try_create_profile(&self, name: &str, extends: &[String]) -> Result<(), ProfileError> {
        check_name(name)?;

        let profile_dir = self.profile_dir(name);
        if let Err(e) = fs::create_dir(&profile_dir) {
            return Err(match e.kind() {
                io::ErrorKind::AlreadyExists => ProfileError::AlreadyExists(name.to_string()),
                _ => ProfileError::io(&profile_dir, e),
            });
        }

        let config_path = profile_dir.join(PROFILE_CONFIG_FILE);
        let yaml = serde_yaml::to_string(&ProfileConfig::scaffold(name, extends))
            .map_err(|e| ProfileError::io(&config_path, io::Error::other(e)))?;
        fs::write(&config_path, yaml).map_err(|e| ProfileError::io(&config_path, e))?;

        let requirements_path = profile_dir.join(REQUIREMENTS_FILE);
        fs::write(
            &requirements_path,
            format!("# Requirements for {name} profile\n"),
        )
        .map_err(|e| ProfileError::io(&requirements_path, e))?;

        let workflows_dir = profile_dir.join(WORKFLOWS_DIR);
        fs::create_dir(&workflows_dir).map_err(|e| ProfileError::io(&workflows_dir, e))?;

        tracing::info!("Created profile: {}", name);
        Ok(())
    }
}

/// Reject names that are empty, hidden, or could escape the root directory
pub fn check_name(name: &str) -> Result<(), ProfileError> {
    let valid = !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0']);

    if valid {
        Ok(())
    } else {
        Err(ProfileError::InvalidName(name.to_string()))
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.is_file()
        && matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        )
}

/// Parse every YAML file directly inside `profile_dir`, one error per bad file
fn check_yaml_syntax(profile_dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(profile_dir) {
        Ok(entries) => entries,
        Err(e) => {
            return vec![format!(
                "Failed to read profile directory {}: {e}",
                profile_dir.display()
            )];
        }
    };

    let mut yaml_files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_yaml_file(path))
        .collect();
    yaml_files.sort();

    yaml_files
        .iter()
        .filter_map(|path| {
            let file_name = path.file_name()?.to_string_lossy();
            match fs::read_to_string(path) {
                Ok(content) => serde_yaml::from_str::<serde_yaml::Value>(&content)
                    .err()
                    .map(|e| format!("Invalid YAML in {file_name}: {e}")),
                Err(e) => Some(format!("Failed to read {file_name}: {e}")),
            }
        })
        .collect()
}
