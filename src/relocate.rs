use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelocateError {
    #[error("{0} has no file name")]
    NoFileName(PathBuf),

    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Relocation reports where the file ended up"]
pub enum Relocation {
    Moved { to: PathBuf },
    /// A file with the same name already sits in the destination; the
    /// source is left where it is.
    AlreadyPresent { to: PathBuf },
}

impl Relocation {
    pub fn destination(&self) -> &Path {
        match self {
            Relocation::Moved { to } | Relocation::AlreadyPresent { to } => to,
        }
    }
}

/// Move `file` into `dest_dir`, keeping its file name.
pub fn relocate(file: &Path, dest_dir: &Path) -> Result<Relocation, RelocateError> {
    let name = file
        .file_name()
        .ok_or_else(|| RelocateError::NoFileName(file.to_path_buf()))?;
    let to = dest_dir.join(name);

    if to.exists() {
        return Ok(Relocation::AlreadyPresent { to });
    }

    fs::create_dir_all(dest_dir).map_err(|source| RelocateError::CreateDir {
        path: dest_dir.to_path_buf(),
        source,
    })?;

    let move_err = |source| RelocateError::Move {
        from: file.to_path_buf(),
        to: to.clone(),
        source,
    };

    if fs::rename(file, &to).is_err() {
        // rename cannot cross filesystems; fall back to copy + remove
        fs::copy(file, &to).map_err(move_err)?;
        fs::remove_file(file).map_err(move_err)?;
    }

    Ok(Relocation::Moved { to })
}
