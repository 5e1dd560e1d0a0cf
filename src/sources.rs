// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: sources  —  per-directory source-file resolution
//
//  The file set for a directory comes from, in order of precedence:
//    1. an explicit `sources.kaji` listing inside the directory
//    2. a directory scan for .c/.cpp plus the toolchain's asm extensions
//  and is then narrowed by the entry's include/exclude filter, if any.
// ─────────────────────────────────────────────────────────────────────────────

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{KajiError, Result};
use crate::manifest::{FileFilter, FilterMode};
use crate::workspace::SOURCES_NAME;

/// List the files in `dir` matching the given extensions (no leading dot).
/// Results are sorted for cross-platform determinism.
///
/// `derived` selects which missing-directory diagnostic is raised: a missing
/// derived/build directory means a prior build step did not run, which is a
/// different user mistake than a bad source path.
pub fn list_dir_by_ext(dir: &Path, exts: &[&str], derived: bool) -> Result<Vec<String>> {
    if !dir.is_dir() {
        let shown = dir.display().to_string();
        return Err(if derived {
            KajiError::DerivedDirMissing(shown)
        } else {
            KajiError::SourceDirMissing(shown)
        });
    }

    let mut results: Vec<String> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .filter(|name| exts.iter().any(|ext| name.ends_with(&format!(".{ext}"))))
        .collect();
    results.sort();
    Ok(results)
}

/// The candidate file list for a directory: `sources.kaji` when present,
/// otherwise an extension scan.
pub fn files_to_build(dir: &Path, asm_exts: &[&str]) -> Result<Vec<String>> {
    let listing = dir.join(SOURCES_NAME);
    if !listing.is_file() {
        let mut exts = vec!["c", "cpp"];
        exts.extend_from_slice(asm_exts);
        return list_dir_by_ext(dir, &exts, false);
    }

    let text = fs::read_to_string(&listing)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_owned)
        .collect())
}

/// Narrow `files` by the entry's include/exclude filter.
pub fn apply_filter(files: Vec<String>, filter: Option<&FileFilter>) -> Vec<String> {
    match filter {
        None => files,
        Some(f) => match f.mode {
            FilterMode::Include => f.files.clone(),
            FilterMode::Exclude => files
                .into_iter()
                .filter(|name| !f.files.contains(name))
                .collect(),
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn dir_with(files: &[&str]) -> TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for f in files {
            fs::write(tmp.path().join(f), "").unwrap();
        }
        tmp
    }

    #[test]
    fn extension_scan_is_filtered_and_sorted() {
        let tmp = dir_with(&["b.cpp", "a.c", "notes.txt", "x.s"]);
        let got = files_to_build(tmp.path(), &["s"]).unwrap();
        assert_eq!(got, vec!["a.c", "b.cpp", "x.s"]);
    }

    #[test]
    fn explicit_listing_overrides_the_scan() {
        let tmp = dir_with(&["a.c", "b.cpp"]);
        fs::write(
            tmp.path().join(SOURCES_NAME),
            "# hand-maintained list\nonly_this.cpp\n\n",
        )
        .unwrap();
        let got = files_to_build(tmp.path(), &[]).unwrap();
        assert_eq!(got, vec!["only_this.cpp"]);
    }

    #[test]
    fn missing_source_and_derived_dirs_are_distinguished() {
        let gone = Path::new("/kaji-test/definitely/not/here");
        assert!(matches!(
            list_dir_by_ext(gone, &["c"], false).unwrap_err(),
            KajiError::SourceDirMissing(_)
        ));
        assert!(matches!(
            list_dir_by_ext(gone, &["o"], true).unwrap_err(),
            KajiError::DerivedDirMissing(_)
        ));
    }

    #[test]
    fn include_filter_replaces_the_list() {
        let files = vec!["a.c".to_owned(), "b.c".to_owned()];
        let filter = FileFilter {
            mode:  FilterMode::Include,
            files: vec!["b.c".into(), "c.c".into()],
        };
        assert_eq!(apply_filter(files, Some(&filter)), vec!["b.c", "c.c"]);
    }

    #[test]
    fn exclude_filter_subtracts_from_the_list() {
        let files = vec!["a.c".to_owned(), "b.c".to_owned(), "c.c".to_owned()];
        let filter = FileFilter {
            mode:  FilterMode::Exclude,
            files: vec!["b.c".into()],
        };
        assert_eq!(apply_filter(files, Some(&filter)), vec!["a.c", "c.c"]);
    }

    #[test]
    fn no_filter_passes_the_list_through() {
        let files = vec!["a.c".to_owned()];
        assert_eq!(apply_filter(files.clone(), None), files);
    }
}
