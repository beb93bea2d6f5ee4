//! Build producers: obtain one variant's artifacts for a product.
//!
//! [`CommandBuildProducer`] runs the configured build steps and collects
//! their output into a per-variant directory. [`PrebuiltProducer`] hands
//! back artifacts that already exist.

use async_trait::async_trait;
use parity_core::{ParityError, ReportLayout, Result, Variant};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info, warn};

use crate::config::Config;

/// A product to build and verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Product name
    pub name: String,
    /// Release configuration
    pub release: String,
    /// Build variant (user, userdebug, eng)
    pub build_variant: String,
}

impl Product {
    /// Create a product descriptor.
    pub fn new(name: impl Into<String>, release: impl Into<String>, build_variant: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: release.into(),
            build_variant: build_variant.into(),
        }
    }

    /// Substitute `{product}`, `{release}` and `{build_variant}` in `template`.
    #[must_use]
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{product}", &self.name)
            .replace("{release}", &self.release)
            .replace("{build_variant}", &self.build_variant)
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.name, self.release, self.build_variant)
    }
}

/// Where one variant's artifacts ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifactSet {
    /// The packaged archive
    pub archive: PathBuf,
    /// Directory of standalone installed images, if any
    pub install_dir: Option<PathBuf>,
}

/// Produces the artifacts of one variant of one product.
///
/// Calls are made one at a time; implementations need not be reentrant.
#[async_trait]
pub trait BuildProducer {
    /// Build (or locate) the artifacts for `product` under `variant`.
    async fn produce(&self, product: &Product, variant: Variant) -> Result<BuildArtifactSet>;
}

/// Runs the configured build steps as child processes.
#[derive(Debug, Clone)]
pub struct CommandBuildProducer {
    config: Config,
    out_dir: PathBuf,
    layout: ReportLayout,
}

impl CommandBuildProducer {
    /// Create a producer writing into `out_dir` and collecting under `layout`.
    pub fn new(config: Config, out_dir: impl Into<PathBuf>, layout: ReportLayout) -> Self {
        Self {
            config,
            out_dir: out_dir.into(),
            layout,
        }
    }

    fn log_path(&self) -> PathBuf {
        self.out_dir.join("build.log")
    }

    /// Run every build step, appending output to the build log.
    async fn run_steps(&self, product: &Product, variant: Variant) -> Result<()> {
        std::fs::create_dir_all(&self.out_dir).map_err(|e| ParityError::io(&self.out_dir, e))?;
        let log_path = self.log_path();
        let log = File::create(&log_path).map_err(|e| ParityError::io(&log_path, e))?;
        let extra_args = &self.config.variant(variant).extra_args;

        for (i, step) in self.config.build.steps.iter().enumerate() {
            let Some((program, args)) = step.split_first() else {
                return Err(ParityError::Config(format!("build step {i} is empty")));
            };
            let args: Vec<String> = args
                .iter()
                .map(|a| product.expand(a))
                .chain(extra_args.iter().cloned())
                .collect();

            info!(%product, %variant, step = i, program = %program, "running build step");
            debug!(?args, "build step arguments");

            let stdout = log.try_clone().map_err(|e| ParityError::io(&log_path, e))?;
            let stderr = log.try_clone().map_err(|e| ParityError::io(&log_path, e))?;
            let status = tokio::process::Command::new(product.expand(program))
                .args(&args)
                .envs(&self.config.build.env)
                .stdin(Stdio::null())
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(stderr))
                .status()
                .await
                .map_err(|e| ParityError::io(program, e))?;

            if !status.success() {
                return Err(ParityError::BuildFailure {
                    variant,
                    status: status.to_string(),
                    log_path,
                });
            }
        }

        Ok(())
    }

    /// Move this variant's archive and build log into its own directory.
    ///
    /// The directory is recreated from scratch so stale artifacts from an
    /// earlier run can never be picked up.
    fn collect_artifacts(&self, product: &Product, variant: Variant) -> Result<PathBuf> {
        let dir = self
            .layout
            .variant_dir(&product.name, &self.config.variant(variant).slug);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| ParityError::io(&dir, e))?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| ParityError::io(&dir, e))?;

        let pattern = product.expand(&self.config.artifacts.archive_glob);
        let archive_name = match read_build_id(&self.out_dir.join(&self.config.artifacts.build_id_file)) {
            Some(id) => pattern.replace('*', &id),
            None => pattern,
        };

        let mut moved = matching_files(self.layout.dist_dir(), &archive_name, variant)?;
        moved.push(self.log_path());
        for file in moved.into_iter().filter(|f| f.is_file()) {
            move_into(&file, &dir)?;
        }

        Ok(dir)
    }
}

#[async_trait]
impl BuildProducer for CommandBuildProducer {
    async fn produce(&self, product: &Product, variant: Variant) -> Result<BuildArtifactSet> {
        let built = self.run_steps(product, variant).await;

        // keep the log of a failed build next to the successful one
        let collected = self.collect_artifacts(product, variant);
        let dir = match (built, collected) {
            (Ok(()), Ok(dir)) => dir,
            (Err(ParityError::BuildFailure { variant, status, log_path }), collected) => {
                let log_path = match collected {
                    Ok(dir) => dir.join("build.log"),
                    Err(e) => {
                        warn!(%product, %variant, error = %e, "could not collect failed build output");
                        log_path
                    }
                };
                return Err(ParityError::BuildFailure {
                    variant,
                    status,
                    log_path,
                });
            }
            (Err(e), _) | (Ok(()), Err(e)) => return Err(e),
        };

        let archive = find_archive(&dir, &self.config.artifacts.archive_glob, product, variant)?;
        let install_dir = self.out_dir.join(product.expand(&self.config.artifacts.install_dir));
        Ok(BuildArtifactSet {
            archive,
            install_dir: Some(install_dir),
        })
    }
}

/// Returns artifacts that were produced elsewhere.
#[derive(Debug, Clone)]
pub struct PrebuiltProducer {
    a: BuildArtifactSet,
    b: BuildArtifactSet,
}

impl PrebuiltProducer {
    /// Serve `a` for variant A and `b` for variant B.
    #[must_use]
    pub const fn new(a: BuildArtifactSet, b: BuildArtifactSet) -> Self {
        Self { a, b }
    }
}

#[async_trait]
impl BuildProducer for PrebuiltProducer {
    async fn produce(&self, _product: &Product, variant: Variant) -> Result<BuildArtifactSet> {
        let set = match variant {
            Variant::A => &self.a,
            Variant::B => &self.b,
        };
        if !set.archive.is_file() {
            return Err(ParityError::ArtifactNotFound {
                variant,
                path: set.archive.display().to_string(),
            });
        }
        if let Some(dir) = &set.install_dir {
            if !dir.is_dir() {
                return Err(ParityError::ArtifactNotFound {
                    variant,
                    path: dir.display().to_string(),
                });
            }
        }
        Ok(set.clone())
    }
}

/// Locate the single archive matching `archive_glob` inside `dir`.
///
/// # Errors
///
/// Returns `ParityError::ArtifactNotFound` unless exactly one file matches.
pub fn find_archive(dir: &Path, archive_glob: &str, product: &Product, variant: Variant) -> Result<PathBuf> {
    let pattern = product.expand(archive_glob);
    let mut found = matching_files(dir, &pattern, variant)?;
    if found.len() != 1 {
        if found.len() > 1 {
            warn!(count = found.len(), dir = %dir.display(), %pattern, "ambiguous archive match");
        }
        return Err(ParityError::ArtifactNotFound {
            variant,
            path: dir.join(&pattern).display().to_string(),
        });
    }
    Ok(found.remove(0))
}

fn matching_files(dir: &Path, pattern: &str, variant: Variant) -> Result<Vec<PathBuf>> {
    let full = dir.join(glob::Pattern::escape(pattern).replace("[*]", "*"));
    let full = full.to_string_lossy();
    let paths = glob::glob(&full).map_err(|e| ParityError::Config(format!("invalid archive pattern {full}: {e}")))?;

    let mut out = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => out.push(path),
            Ok(_) => {}
            Err(e) => warn!(%variant, error = %e, "unreadable glob entry"),
        }
    }
    out.sort();
    Ok(out)
}

fn read_build_id(path: &Path) -> Option<String> {
    let id = std::fs::read_to_string(path).ok()?;
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

fn move_into(file: &Path, dir: &Path) -> Result<()> {
    let Some(name) = file.file_name() else {
        return Ok(());
    };
    let dest = dir.join(name);
    if std::fs::rename(file, &dest).is_err() {
        // cross-device: fall back to copy + delete
        std::fs::copy(file, &dest).map_err(|e| ParityError::io(file, e))?;
        std::fs::remove_file(file).map_err(|e| ParityError::io(file, e))?;
    }
    debug!(from = %file.display(), to = %dest.display(), "collected artifact");
    Ok(())
}
