//! Build context walker

use crate::error::ArtifactError;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// Name of the ignore file read from the build context root
pub const DOCKERIGNORE: &str = ".dockerignore";

/// A file inside the build context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// Names ignored at any depth; `*.ext` matches by extension
    pub ignore_patterns: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: vec![
                ".git".to_string(),
                "__pycache__".to_string(),
                ".venv".to_string(),
                ".pytest_cache".to_string(),
                "node_modules".to_string(),
                "cdk.out".to_string(),
            ],
            max_depth: None,
        }
    }
}

impl WalkerConfig {
    /// Extend the ignore list with entries from `<root>/.dockerignore`.
    ///
    /// Comments, blank lines and negations are skipped; leading and trailing
    /// slashes are dropped. Patterns containing `/` match a relative path and
    /// everything below it. Glob forms other than `*.ext` are not supported
    /// and are logged and skipped.
    pub fn with_dockerignore(mut self, root: &Path) -> Result<Self, ArtifactError> {
        let ignore_file = root.join(DOCKERIGNORE);
        if !ignore_file.is_file() {
            return Ok(self);
        }
        let contents = std::fs::read_to_string(&ignore_file)?;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let pattern = line.trim_start_matches('/').trim_end_matches('/');
            if !is_supported_pattern(pattern) {
                warn!(pattern = %line, file = %ignore_file.display(), "Unsupported ignore pattern skipped");
                continue;
            }
            if !pattern.is_empty() && !self.ignore_patterns.iter().any(|p| p == pattern) {
                self.ignore_patterns.push(pattern.to_string());
            }
        }
        Ok(self)
    }
}

/// Walks a build context and returns its files in path order
pub struct ContextWalker {
    root: PathBuf,
    config: WalkerConfig,
}

impl ContextWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Collect all non-ignored files, sorted by path for determinism.
    pub fn walk(&self) -> Result<Vec<ContextFile>, ArtifactError> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.should_ignore(entry));

        for entry in walker {
            let entry = entry.map_err(|e| {
                ArtifactError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk build context: {}", e),
                ))
            })?;

            let metadata = entry.metadata().map_err(|e| {
                ArtifactError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to read metadata for {:?}: {}", entry.path(), e),
                ))
            })?;

            // Directories contribute through their files; symlinks are skipped unless followed
            if metadata.is_file() {
                files.push(ContextFile {
                    path: entry.path().to_path_buf(),
                    size: metadata.len(),
                });
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Match ignore patterns against components relative to the root only
    fn should_ignore(&self, entry: &DirEntry) -> bool {
        let relative = match entry.path().strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => return false,
        };

        let key = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        for pattern in self.config.ignore_patterns.iter().filter(|p| p.contains('/')) {
            if key == *pattern || key.starts_with(&format!("{}/", pattern)) {
                return true;
            }
        }

        for component in relative.components() {
            if let Component::Normal(name) = component {
                let name = name.to_string_lossy();
                for pattern in &self.config.ignore_patterns {
                    if matches_pattern(&name, pattern) {
                        return true;
                    }
                }
            }
        }

        false
    }
}

/// Literal names, literal relative paths, and `*.ext`
fn is_supported_pattern(pattern: &str) -> bool {
    let literal = |p: &str| !p.contains(['*', '?', '[']);
    match pattern.strip_prefix("*.") {
        Some(ext) => literal(ext) && !ext.contains('/'),
        None => literal(pattern),
    }
}

fn matches_pattern(name: &str, pattern: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(ext) => name
            .rsplit_once('.')
            .map(|(_, e)| e == ext)
            .unwrap_or(false),
        None => name == pattern,
    }
}
