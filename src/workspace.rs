// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: workspace  —  root-directory resolution & path normalization
//
//  A build always runs against three roots taken from the environment:
//
//    KAJI_WORK_ROOT    workspace root (holds one or more package checkouts)
//    KAJI_PKG_ROOT     root of the package being built
//    KAJI_XPKGS_ROOT   root of the external-packages area
//
//  All path strings entering the system are separator-normalized so that
//  manifests written on Windows resolve on POSIX hosts and vice versa.
// ─────────────────────────────────────────────────────────────────────────────

use std::env;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use crate::error::{KajiError, Result};

/// Directory-list manifest filename, one per participating directory.
pub const LIBDIRS_NAME: &str = "libdirs.kaji";
/// Optional explicit source-list filename inside a source directory.
pub const SOURCES_NAME: &str = "sources.kaji";
/// Reserved directory name that marks external-package entries.
pub const XPKGS_DIRNAME: &str = "xpkgs";

pub const ENV_WORK_ROOT: &str = "KAJI_WORK_ROOT";
pub const ENV_PKG_ROOT: &str = "KAJI_PKG_ROOT";
pub const ENV_XPKGS_ROOT: &str = "KAJI_XPKGS_ROOT";

/// The three process-wide roots, resolved once per invocation and
/// passed explicitly to every component that needs them.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub work_root:  PathBuf,
    pub pkg_root:   PathBuf,
    pub xpkgs_root: PathBuf,
}

impl Workspace {
    /// Resolve the roots from the standard environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(ENV_WORK_ROOT, ENV_PKG_ROOT, ENV_XPKGS_ROOT)
    }

    /// Resolve the roots from arbitrary variable names.
    pub fn from_vars(work: &str, pkg: &str, xpkgs: &str) -> Result<Self> {
        match (env::var(work), env::var(pkg), env::var(xpkgs)) {
            (Ok(w), Ok(p), Ok(x)) => Ok(Self {
                work_root:  PathBuf::from(standardize_dir_sep(&w)),
                pkg_root:   PathBuf::from(standardize_dir_sep(&p)),
                xpkgs_root: PathBuf::from(standardize_dir_sep(&x)),
            }),
            _ => Err(KajiError::MissingRoots),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Rewrite both separator styles to the host separator.
pub fn standardize_dir_sep(pathinfo: &str) -> String {
    let sep = MAIN_SEPARATOR.to_string();
    pathinfo.replace('/', &sep).replace('\\', &sep)
}

/// Drop a leading `C:`-style drive prefix, if any.
pub fn strip_drive_letter(path: &str) -> &str {
    match path.split_once(':') {
        Some((_, rest)) => rest,
        None => path,
    }
}

// ── Scoped working directory ──────────────────────────────────────────────────

/// RAII guard that changes the process working directory and restores the
/// previous one when dropped, on every exit path including errors.
pub struct ScopedDir {
    prev: PathBuf,
}

impl ScopedDir {
    pub fn push(dir: &Path) -> Result<Self> {
        let prev = env::current_dir()?;
        env::set_current_dir(dir)?;
        Ok(Self { prev })
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.prev);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
