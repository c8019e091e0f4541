//! Deterministic naming of derived stage outputs.
//!
//! Every cached artifact of the per-image pipeline is named from the original
//! input path plus a stage-specific suffix, which makes the on-disk outputs
//! double as a memoization cache: a stage whose output already exists is
//! skipped.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Feedback;

/// Naming rule for a sibling of an input path.
///
/// The new file name is `prefix + base + postfix + ext`, where `base` and
/// `ext` come from the input unless replaced. `ext` includes its leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedPath<'a> {
    pub prefix: &'a str,
    pub postfix: &'a str,
    pub replace_base: Option<&'a str>,
    pub replace_ext: Option<&'a str>,
    pub temp_dir: Option<&'a Path>,
}

impl<'a> RelatedPath<'a> {
    pub fn postfix(postfix: &'a str) -> Self {
        Self {
            postfix,
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn with_base(mut self, base: &'a str) -> Self {
        self.replace_base = Some(base);
        self
    }

    pub fn with_ext(mut self, ext: &'a str) -> Self {
        self.replace_ext = Some(ext);
        self
    }

    pub fn in_dir(mut self, dir: Option<&'a Path>) -> Self {
        self.temp_dir = dir;
        self
    }
}

/// `related_file_path("/a/b/file.ext", prefix "x.", postfix ".y")` is
/// `/a/b/x.file.y.ext`.
pub fn related_file_path(input: &Path, rule: &RelatedPath<'_>) -> PathBuf {
    let dir = match rule.temp_dir {
        Some(d) => d.to_path_buf(),
        None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
    };

    let base: OsString = match rule.replace_base {
        Some(b) => b.into(),
        None => input.file_stem().map(OsString::from).unwrap_or_default(),
    };

    let ext: OsString = match rule.replace_ext {
        Some(e) => e.into(),
        None => match input.extension() {
            Some(e) => {
                let mut dotted = OsString::from(".");
                dotted.push(e);
                dotted
            }
            None => OsString::new(),
        },
    };

    let mut name = OsString::from(rule.prefix);
    name.push(base);
    name.push(rule.postfix);
    name.push(ext);
    dir.join(name)
}

/// On-disk cache of stage outputs keyed by [`related_file_path`].
#[derive(Debug, Clone, Default)]
pub struct StageCache {
    temp_dir: Option<PathBuf>,
}

impl StageCache {
    pub fn new(temp_dir: Option<PathBuf>) -> Self {
        Self { temp_dir }
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    /// Cache key of stage `postfix` for `input`.
    pub fn path_for(&self, input: &Path, postfix: &str, replace_ext: Option<&str>) -> PathBuf {
        let rule = RelatedPath {
            postfix,
            replace_ext,
            temp_dir: self.temp_dir.as_deref(),
            ..RelatedPath::default()
        };
        related_file_path(input, &rule)
    }

    pub fn is_cached(&self, output: &Path) -> bool {
        output.is_file()
    }

    /// Runs `stage` unless `output` already exists.
    ///
    /// Returns `Ok(true)` when the stage ran, `Ok(false)` when the cached
    /// output was reused.
    pub fn run_or_reuse<E>(
        &self,
        output: &Path,
        label: &str,
        feedback: &dyn Feedback,
        stage: impl FnOnce(&Path) -> Result<(), E>,
    ) -> Result<bool, E> {
        if self.is_cached(output) {
            feedback.info(&format!(
                "Using already computed {label}: {}",
                output.display()
            ));
            return Ok(false);
        }
        stage(output)?;
        Ok(true)
    }
}

/// Scoped ownership of temporary files.
///
/// The files are removed when the guard drops, on success and error paths
/// alike.
#[derive(Debug)]
pub struct TempArtifact {
    paths: Vec<PathBuf>,
}

impl TempArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
        }
    }

    /// Adds a companion file (e.g. a metadata sidecar) to the guard.
    pub fn with_companion(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.paths[0]
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        for p in &self.paths {
            if p.exists() {
                if let Err(e) = fs::remove_file(p) {
                    log::warn!("failed to remove temporary file {}: {e}", p.display());
                } else {
                    log::debug!("removed temporary file {}", p.display());
                }
            }
        }
    }
}
