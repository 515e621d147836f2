use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::MarkerError;
use crate::MarkerResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["markers.toml", ".markers.toml", ".config/markers.toml"];

/// Project configuration.
///
/// ```toml
/// resources = ["config/deployment.yaml"]
///
/// [placeholders]
/// parent = "parent.Spec"
/// collection = "collection.Spec"
///
/// [collection]
/// enabled = true
/// resources = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarkersConfig {
	/// Manifest files to inspect, relative to the project root.
	#[serde(default)]
	pub resources: Vec<PathBuf>,
	#[serde(default)]
	pub placeholders: Placeholders,
	#[serde(default)]
	pub collection: CollectionConfig,
}

/// The source references annotated values are replaced with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Placeholders {
	/// Prefix for field markers.
	pub parent: String,
	/// Prefix for collection field markers.
	pub collection: String,
}

impl Default for Placeholders {
	fn default() -> Self {
		Self {
			parent: "parent.Spec".into(),
			collection: "collection.Spec".into(),
		}
	}
}

/// Describes the kind of workload the manifests belong to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionConfig {
	/// The manifests define a collection.
	pub enabled: bool,
	/// The collection's own manifests are resources of the collection, so its
	/// field markers also produce spec fields.
	pub resources: bool,
}

impl MarkersConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> MarkerResult<Option<MarkersConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = content.parse()?;

		Ok(Some(config))
	}

	/// The configured resource paths resolved against `root`.
	pub fn resource_paths(&self, root: &Path) -> Vec<PathBuf> {
		self.resources.iter().map(|path| root.join(path)).collect()
	}
}

impl std::str::FromStr for MarkersConfig {
	type Err = MarkerError;

	fn from_str(content: &str) -> Result<Self, Self::Err> {
		toml::from_str(content).map_err(|error| MarkerError::ConfigParse(error.to_string()))
	}
}
