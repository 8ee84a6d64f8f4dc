//! Template discovery over a file or directory tree.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Extensions audited when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "template"];

/// Errors that can occur while discovering templates.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum DiscoveryError {
    /// The input path does not exist.
    #[error("input path not found: {}", path.display())]
    #[diagnostic(code(cfn_audit::discovery::not_found))]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Walking the directory failed.
    #[error("failed to walk {}: {source}", path.display())]
    #[diagnostic(code(cfn_audit::discovery::walk))]
    Walk {
        /// Root being walked.
        path: PathBuf,
        /// Underlying walk error.
        source: walkdir::Error,
    },

    /// An exclude pattern is not a valid glob.
    #[error("invalid exclude pattern: {0}")]
    #[diagnostic(code(cfn_audit::discovery::glob))]
    Glob(#[from] glob::PatternError),
}

/// Resolves an input path into the ordered list of templates to audit.
#[derive(Debug, Clone)]
pub struct TemplateDiscovery {
    extensions: Vec<String>,
    exclude: Vec<glob::Pattern>,
}

impl Default for TemplateDiscovery {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

impl TemplateDiscovery {
    /// Creates a discovery with the default extensions and no excludes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the accepted extensions (without the leading dot).
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Adds exclude glob patterns.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Glob`] if a pattern is invalid.
    pub fn excludes<I, S>(mut self, patterns: I) -> Result<Self, DiscoveryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            self.exclude.push(glob::Pattern::new(pattern.as_ref())?);
        }
        Ok(self)
    }

    /// Discovers templates under `input`.
    ///
    /// A file is returned as-is. A directory is walked recursively and every
    /// file with an accepted extension that is not excluded is returned,
    /// sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` does not exist or the walk fails.
    pub fn discover(&self, input: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
        if !input.exists() {
            return Err(DiscoveryError::NotFound {
                path: input.to_path_buf(),
            });
        }
        if input.is_file() {
            return Ok(vec![input.to_path_buf()]);
        }

        let mut templates = Vec::new();
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.map_err(|source| DiscoveryError::Walk {
                path: input.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.has_accepted_extension(path) {
                continue;
            }
            if self.should_exclude(path, input) {
                debug!("Excluded {}", path.display());
                continue;
            }
            templates.push(path.to_path_buf());
        }
        templates.sort();

        debug!(
            "Discovered {} template(s) under {}",
            templates.len(),
            input.display()
        );
        Ok(templates)
    }

    fn has_accepted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
    }

    /// Checks the absolute-ish walk path and the path relative to the root.
    fn should_exclude(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.exclude
            .iter()
            .any(|p| p.matches_path(path) || p.matches_path(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{}").unwrap();
    }

    fn names(root: &Path, found: &[PathBuf]) -> Vec<String> {
        found
            .iter()
            .map(|p| {
                p.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn directory_is_walked_and_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.yaml");
        touch(dir.path(), "a.json");
        touch(dir.path(), "nested/c.TEMPLATE");
        touch(dir.path(), "nested/d.yml");
        touch(dir.path(), "README.md");

        let found = TemplateDiscovery::new().discover(dir.path()).unwrap();
        assert_eq!(
            names(dir.path(), &found),
            vec!["a.json", "b.yaml", "nested/c.TEMPLATE", "nested/d.yml"]
        );
    }

    #[test]
    fn single_file_is_returned_regardless_of_extension() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "stack.txt");
        let file = dir.path().join("stack.txt");

        let found = TemplateDiscovery::new().discover(&file).unwrap();
        assert_eq!(found, vec![file]);
    }

    #[test]
    fn exclude_patterns_apply() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "keep.json");
        touch(dir.path(), "node_modules/pkg/skip.json");

        let found = TemplateDiscovery::new()
            .excludes(["node_modules/**"])
            .unwrap()
            .discover(dir.path())
            .unwrap();
        assert_eq!(names(dir.path(), &found), vec!["keep.json"]);
    }

    #[test]
    fn custom_extensions() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.json");
        touch(dir.path(), "b.cfn");

        let found = TemplateDiscovery::new()
            .extensions([".cfn"])
            .discover(dir.path())
            .unwrap();
        assert_eq!(names(dir.path(), &found), vec!["b.cfn"]);
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(TemplateDiscovery::new().discover(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = TemplateDiscovery::new()
            .discover(Path::new("/nonexistent/templates"))
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { .. }));
    }

    #[test]
    fn invalid_exclude_is_glob_error() {
        let err = TemplateDiscovery::new().excludes(["[unclosed"]).unwrap_err();
        assert!(matches!(err, DiscoveryError::Glob(_)));
    }
}
