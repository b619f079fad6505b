//! Project tree enumeration.
//!
//! Files directly under the root are always included. Top-level folders
//! whose name is in the exclusion list are skipped along with everything
//! beneath them; all other folders are walked recursively without further
//! folder filtering.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("project root is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to read project root {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to traverse {path}: {source}")]
    Subtree {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Result of walking a project tree.
///
/// Unreadable subtrees do not abort the walk; they are reported in
/// `failures` and their contents are missing from `files`.
#[derive(Debug, Default)]
pub struct Walk {
    pub files: Vec<PathBuf>,
    pub failures: Vec<WalkError>,
}

/// Enumerate every file under `root`, skipping excluded top-level folders.
///
/// Entries are visited in file-name order, so the result is deterministic
/// for a given filesystem state.
pub fn walk_project<S: AsRef<str>>(root: &Path, exclude_folders: &[S]) -> Result<Walk, WalkError> {
    let metadata = std::fs::metadata(root).map_err(|source| WalkError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory(root.to_path_buf()));
    }

    let excluded = |name: &str| {
        exclude_folders
            .iter()
            .map(AsRef::as_ref)
            .any(|folder| !folder.is_empty() && folder == name)
    };

    let mut walk = Walk::default();
    let entries = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !(entry.depth() == 1
                && entry.file_type().is_dir()
                && entry.file_name().to_str().is_some_and(&excluded))
        });

    for entry in entries {
        match entry {
            Ok(entry) if entry.file_type().is_file() => walk.files.push(entry.into_path()),
            Ok(_) => {}
            Err(source) => {
                let path = source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                tracing::warn!(path = %path.display(), "skipping unreadable subtree: {source}");
                walk.failures.push(WalkError::Subtree { path, source });
            }
        }
    }

    Ok(walk)
}

/// Narrows a walk down to source files worth opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    /// File extension without the dot
    pub extension: String,
    /// Exact file names to skip, wherever they appear
    pub exclude_files: Vec<String>,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            extension: "cs".to_string(),
            exclude_files: vec!["AssemblyInfo.cs".to_string()],
        }
    }
}

impl CandidateFilter {
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if self.exclude_files.iter().any(|excluded| excluded == name) {
            return false;
        }
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }

    pub fn filter<'a>(&'a self, files: &'a [PathBuf]) -> impl Iterator<Item = &'a PathBuf> + 'a {
        files.iter().filter(move |path| self.accepts(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn relative(walk: &Walk, root: &Path) -> Vec<String> {
        walk.files
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
    fn test_walk_skips_excluded_top_level_folders() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(root, "Widget.cs");
        touch(root, "bin/Debug/Widget.dll");
        touch(root, "obj/project.assets.json");
        touch(root, "Models/Order.cs");
        touch(root, "Models/bin/Nested.cs");

        let walk = walk_project(root, &["bin", "obj"]).unwrap();
        assert!(walk.failures.is_empty());
        assert_eq!(
            relative(&walk, root),
            vec!["Models/Order.cs", "Models/bin/Nested.cs", "Widget.cs"]
        );
    }

    #[test]
    fn test_root_files_always_included() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(root, "bin");

        let walk = walk_project(root, &["bin"]).unwrap();
        assert_eq!(relative(&walk, root), vec!["bin"]);
    }

    #[test]
    fn test_empty_exclusion_entry_is_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        touch(root, "Services/Mailer.cs");

        let walk = walk_project(root, &[""]).unwrap();
        assert_eq!(relative(&walk, root), vec!["Services/Mailer.cs"]);
    }

    #[test]
    fn test_walk_is_deterministic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        for name in ["c.cs", "a.cs", "B/x.cs", "b.cs"] {
            touch(root, name);
        }

        let first = walk_project::<&str>(root, &[]).unwrap();
        let second = walk_project::<&str>(root, &[]).unwrap();
        assert_eq!(first.files, second.files);
        assert_eq!(first.files.len(), 4);
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = walk_project::<&str>(&temp_dir.path().join("nope"), &[]);
        assert!(matches!(result, Err(WalkError::Root { .. })));
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        touch(temp_dir.path(), "file.cs");
        let result = walk_project::<&str>(&temp_dir.path().join("file.cs"), &[]);
        assert!(matches!(result, Err(WalkError::NotADirectory(_))));
    }

    #[test]
    fn test_candidate_filter() {
        let filter = CandidateFilter::default();
        assert!(filter.accepts(Path::new("/p/Widget.cs")));
        assert!(!filter.accepts(Path::new("/p/Properties/AssemblyInfo.cs")));
        assert!(!filter.accepts(Path::new("/p/Widget.csproj")));
        assert!(!filter.accepts(Path::new("/p/README")));

        let files = vec![PathBuf::from("a.cs"), PathBuf::from("b.txt")];
        let kept: Vec<_> = filter.filter(&files).collect();
        assert_eq!(kept, vec![&PathBuf::from("a.cs")]);
    }
}
