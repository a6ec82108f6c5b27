use serde::Deserialize;

use crate::version::SchemaVersion;

/// Configuration for a [`Resolver`](crate::Resolver).
///
/// Deserializes from any serde format, so it can live in the embedding
/// application's config file:
///
/// ```toml
/// min_supported_version = 2
/// validate_on_build = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Messages older than this version are rejected as unknown, even though
    /// the registry can still convert them. `None` accepts everything back to
    /// v1.
    pub min_supported_version: Option<SchemaVersion>,
    /// Run [`VersionRegistry::validate`](crate::VersionRegistry::validate)
    /// when the resolver is built and refuse to build on failure.
    pub validate_on_build: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_supported_version: None,
            validate_on_build: true,
        }
    }
}

impl ResolverConfig {
    /// Set the oldest accepted version.
    pub fn min_supported_version(mut self, version: SchemaVersion) -> Self {
        self.min_supported_version = Some(version);
        self
    }

    /// Skip registry validation when building the resolver.
    pub fn skip_validation(mut self) -> Self {
        self.validate_on_build = false;
        self
    }
}
