//! Configuration management.
//!
//! Everything here is static data versioned alongside the verification
//! logic: build steps, artifact locations, labels and allowlists. Output and
//! distribution directories are not configuration; they come from the
//! command line (or `OUT_DIR` / `DIST_DIR`) and are passed explicitly.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use parity_core::images::DEFAULT_INSTALLED_IMAGES;
use parity_core::{AllowlistPolicy, Variant, VariantLabels};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Release passed to every build
    #[serde(default = "default_release")]
    pub release: String,

    /// Build variant (user, userdebug, eng) passed to every build
    #[serde(default = "default_build_variant")]
    pub build_variant: String,

    /// Directory under the dist dir that holds per-product results
    #[serde(default = "default_report_dir_name")]
    pub report_dir_name: String,

    /// Prefix shown before installed image names in reports
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,

    /// First pipeline
    #[serde(default = "VariantConfig::default_a")]
    pub variant_a: VariantConfig,

    /// Second pipeline
    #[serde(default = "VariantConfig::default_b")]
    pub variant_b: VariantConfig,

    /// How to invoke the build
    #[serde(default)]
    pub build: BuildConfig,

    /// Where builds leave their output
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Identifiers allowed to diverge, per scope
    #[serde(default)]
    pub allowlist: AllowlistPolicy,
}

/// One of the two pipelines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Name used in reports
    pub label: String,
    /// Subdirectory collecting this variant's artifacts
    pub slug: String,
    /// Arguments appended to every build step
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl VariantConfig {
    fn default_a() -> Self {
        Self {
            label: String::from("soong only"),
            slug: String::from("soong_only"),
            extra_args: vec![String::from("--soong-only")],
        }
    }

    fn default_b() -> Self {
        Self {
            label: String::from("soong plus make"),
            slug: String::from("soong_plus_make"),
            extra_args: vec![String::from("--no-soong-only")],
        }
    }
}

/// Build invocation.
///
/// Each step is an argv; `{product}`, `{release}` and `{build_variant}` are
/// substituted. Steps run in order and stop at the first failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Commands to run, in order
    pub steps: Vec<Vec<String>>,
    /// Extra environment variables for every step
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let base = [
            "build/soong/soong_ui.bash",
            "--make-mode",
            "USE_RBE=true",
            "BUILD_DATETIME=1",
            "USE_FIXED_TIMESTAMP_IMG_FILES=true",
            "DISABLE_NOTICE_XML_GENERATION=true",
            "TARGET_PRODUCT={product}",
            "TARGET_RELEASE={release}",
            "TARGET_BUILD_VARIANT={build_variant}",
        ];
        let step = |targets: &[&str]| {
            base.iter()
                .chain(targets)
                .map(|s| (*s).to_string())
                .collect::<Vec<_>>()
        };

        Self {
            // dist is split out so only the archive gets copied
            steps: vec![step(&["droid"]), step(&["target-files-package", "dist"])],
            env: BTreeMap::new(),
        }
    }
}

/// Artifact locations. Relative paths are resolved against the out dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Archive file name pattern; `{product}` is substituted, `*` is the build id
    #[serde(default = "default_archive_glob")]
    pub archive_glob: String,

    /// File holding the build id
    #[serde(default = "default_build_id_file")]
    pub build_id_file: PathBuf,

    /// Install directory of standalone images; `{product}` is substituted
    #[serde(default = "default_install_dir")]
    pub install_dir: String,

    /// Image file names compared between the builds
    #[serde(default = "default_installed_images")]
    pub installed_images: Vec<String>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            archive_glob: default_archive_glob(),
            build_id_file: default_build_id_file(),
            install_dir: default_install_dir(),
            installed_images: default_installed_images(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            release: default_release(),
            build_variant: default_build_variant(),
            report_dir_name: default_report_dir_name(),
            image_prefix: default_image_prefix(),
            variant_a: VariantConfig::default_a(),
            variant_b: VariantConfig::default_b(),
            build: BuildConfig::default(),
            artifacts: ArtifactConfig::default(),
            allowlist: AllowlistPolicy::default(),
        }
    }
}

impl Config {
    /// Get the default config file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "buildparity", "buildparity")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default path is used if
    /// present, otherwise built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_path()?;
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse and validate TOML configuration.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.build.steps.iter().any(Vec::is_empty) {
            anyhow::bail!("build.steps must not contain an empty command");
        }
        if self.variant_a.slug == self.variant_b.slug {
            anyhow::bail!(
                "variant_a.slug and variant_b.slug must differ (both are {:?})",
                self.variant_a.slug
            );
        }
        if !self.artifacts.archive_glob.contains("{product}") {
            tracing::warn!(
                pattern = %self.artifacts.archive_glob,
                "archive_glob does not mention {{product}}"
            );
        }
        Ok(())
    }

    /// Report labels for the two variants.
    #[must_use]
    pub fn labels(&self) -> VariantLabels {
        VariantLabels::new(&self.variant_a.label, &self.variant_b.label)
    }

    /// Settings of one variant.
    #[must_use]
    pub const fn variant(&self, variant: Variant) -> &VariantConfig {
        match variant {
            Variant::A => &self.variant_a,
            Variant::B => &self.variant_b,
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// Default value functions for serde.
fn default_release() -> String {
    String::from("trunk_staging")
}

fn default_build_variant() -> String {
    String::from("userdebug")
}

fn default_report_dir_name() -> String {
    String::from("parity_diffs")
}

fn default_image_prefix() -> String {
    String::from(parity_core::report::DEFAULT_IMAGE_PREFIX)
}

fn default_archive_glob() -> String {
    String::from("{product}-target_files-*.zip")
}

fn default_build_id_file() -> PathBuf {
    PathBuf::from("file_name_tag.txt")
}

fn default_install_dir() -> String {
    String::from("target/product/{product}")
}

fn default_installed_images() -> Vec<String> {
    DEFAULT_INSTALLED_IMAGES.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.release, "trunk_staging");
        assert_eq!(config.build_variant, "userdebug");
        assert_eq!(config.build.steps.len(), 2);
        assert_eq!(config.build.steps[0].last().map(String::as_str), Some("droid"));
        assert_eq!(config.artifacts.installed_images.len(), 20);
        assert!(config.allowlist.archive.contains("META/misc_info.txt"));
        assert_eq!(config.labels().b, "soong plus make");
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.report_dir_name, "parity_diffs");
        assert_eq!(config.variant(Variant::A).slug, "soong_only");
    }

    #[test]
    fn partial_override() {
        let config = Config::parse(
            r#"
            release = "ap4a"

            [variant_a]
            label = "ninja"
            slug = "ninja"

            [allowlist]
            archive = ["META/build.prop"]
            "#,
        )
        .unwrap();
        assert_eq!(config.release, "ap4a");
        assert_eq!(config.variant_a.label, "ninja");
        assert!(config.variant_a.extra_args.is_empty());
        assert_eq!(config.variant_b.slug, "soong_plus_make");
        assert!(config.allowlist.archive.contains("META/build.prop"));
        assert!(!config.allowlist.archive.contains("META/misc_info.txt"));
        // images list not given: built-in entries stay
        assert_eq!(config.allowlist.images, AllowlistPolicy::default().images);
        assert!(config.allowlist.images.contains("vendor.img"));
    }

    #[test]
    fn rejects_identical_slugs() {
        let err = Config::parse(
            r#"
            [variant_a]
            label = "x"
            slug = "same"
            [variant_b]
            label = "y"
            slug = "same"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn rejects_empty_step() {
        let err = Config::parse("[build]\nsteps = [[]]\n").unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }

    #[test]
    fn toml_roundtrip_preserves_allowlists() {
        let config = Config::default();
        let text = config.to_toml().unwrap();
        let back = Config::parse(&text).unwrap();
        assert_eq!(back.allowlist, config.allowlist);
        assert_eq!(back.build.steps, config.build.steps);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/buildparity.toml"))).is_err());
    }
}
