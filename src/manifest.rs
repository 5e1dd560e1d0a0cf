// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: manifest  —  libdirs.kaji directory-list resolution
//
//  A manifest lists one directory reference per line. Reference forms:
//
//      # comment                       ignored, as are blank lines
//      [v1|v2] <rest of line>          only when the active variant matches
//      src/engine                      relative to the package root
//      xpkgs/catch2/src                external package (reserved prefix)
//      /src/engine                     explicit package-root anchor
//      $SDK_ROOT$/lib/hal              absolute, env var expanded in place
//      ./platform/libdirs.kaji        nested manifest (must be a manifest)
//      src/engine < a.cpp b.cpp        include-only source list
//      src/engine > slow.cpp           exclude source list
//
//  The walk is depth-first and order-preserving; nested manifests splice
//  their entries at the point of inclusion. The ancestry chain of manifest
//  files is tracked so an include cycle fails instead of recursing forever.
// ─────────────────────────────────────────────────────────────────────────────

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use colored::Colorize;
use serde::Serialize;

use crate::error::{KajiError, Result};
use crate::expand;
use crate::workspace::{standardize_dir_sep, strip_drive_letter, Workspace};
use crate::workspace::{LIBDIRS_NAME, XPKGS_DIRNAME};

// ── Data model ────────────────────────────────────────────────────────────────

/// Which root a directory entry resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Relative to the package being built.
    Local,
    /// Anchored at the package root with an explicit leading separator.
    Pkg,
    /// Under the reserved external-packages directory.
    #[serde(rename = "xpkg")]
    ExternalPkg,
    /// Fully resolved absolute path (leading env-var reference).
    Absolute,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Provenance::Local       => "local",
            Provenance::Pkg         => "pkg",
            Provenance::ExternalPkg => "xpkg",
            Provenance::Absolute    => "absolute",
        };
        write!(f, "{tag}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Include,
    Exclude,
}

/// Optional per-directory restriction of which source files participate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFilter {
    pub mode:  FilterMode,
    pub files: Vec<String>,
}

/// One resolved build-participant directory. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirEntry {
    pub path:       String,
    pub provenance: Provenance,
    pub filter:     Option<FileFilter>,
}

impl DirEntry {
    /// The on-disk source directory this entry names.
    pub fn src_path(&self, ws: &Workspace) -> PathBuf {
        match self.provenance {
            Provenance::Absolute => PathBuf::from(&self.path),
            Provenance::ExternalPkg => {
                let sep = MAIN_SEPARATOR.to_string();
                let prefix = format!("{XPKGS_DIRNAME}{sep}");
                let rest = self.path.strip_prefix(&prefix).unwrap_or(&self.path);
                ws.xpkgs_root.join(rest)
            }
            Provenance::Local | Provenance::Pkg => ws.pkg_root.join(&self.path),
        }
    }

    /// Where this entry's objects land inside the build tree. Absolute
    /// entries are namespaced under `__abs` with any drive prefix dropped.
    pub fn obj_subdir(&self) -> PathBuf {
        match self.provenance {
            Provenance::Absolute => {
                let stripped = strip_drive_letter(&self.path);
                let stripped = stripped.trim_start_matches(MAIN_SEPARATOR);
                Path::new("__abs").join(stripped)
            }
            _ => PathBuf::from(&self.path),
        }
    }
}

/// Output of a manifest resolution: the ordered entry list plus the raw
/// name list kept for duplicate reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDirs {
    pub entries: Vec<DirEntry>,
    pub names:   Vec<String>,
}

// ── Resolution ────────────────────────────────────────────────────────────────

/// Walk the project's root `libdirs.kaji` and produce the flattened,
/// ordered, duplicate-checked directory list for `variant`.
pub fn resolve_libdirs(
    ws: &Workspace,
    prj_dir: &Path,
    variant: &str,
    allow_duplicates: bool,
    verbose: bool,
) -> Result<ResolvedDirs> {
    let root = prj_dir.join(LIBDIRS_NAME);
    let mut resolved = ResolvedDirs {
        entries: Vec::new(),
        names:   Vec::new(),
    };
    let mut ancestry: Vec<PathBuf> = Vec::new();

    walk_manifest(
        ws,
        prj_dir,
        &root,
        Provenance::Local,
        variant,
        verbose,
        &mut resolved,
        &mut ancestry,
    )?;

    check_duplicates(&mut resolved, allow_duplicates)?;
    Ok(resolved)
}

#[allow(clippy::too_many_arguments)]
fn walk_manifest(
    ws: &Workspace,
    prj_dir: &Path,
    manifest: &Path,
    inherited: Provenance,
    variant: &str,
    verbose: bool,
    resolved: &mut ResolvedDirs,
    ancestry: &mut Vec<PathBuf>,
) -> Result<()> {
    let canon = manifest
        .canonicalize()
        .unwrap_or_else(|_| manifest.to_path_buf());
    if ancestry.contains(&canon) {
        return Err(KajiError::ManifestCycle(manifest.display().to_string()));
    }
    ancestry.push(canon);

    let text = fs::read_to_string(manifest)?;
    for raw in text.lines() {
        let mut line = standardize_dir_sep(raw.trim());
        let mut entry = inherited;
        let mut base: Option<PathBuf> = None;

        // drop comments and blank lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // filter by variant
        if line.starts_with('[') {
            let Some((filter, tail)) = line[1..]
                .split_once(']')
                .map(|(f, t)| (f.to_owned(), t.to_owned()))
            else {
                return Err(KajiError::MalformedVariantFilter(line));
            };
            if !matches_variant(&filter, variant) {
                continue;
            }
            line = tail.trim().to_owned();
            if line.is_empty() {
                continue;
            }
        }

        if line.starts_with(expand::ENV_MARKER) {
            // absolute root via an environment variable
            line = expand::expand_env(&line)?;
            entry = Provenance::Absolute;
        } else if line.starts_with('.') {
            // relative references may only pull in a nested manifest
            if !line.ends_with(LIBDIRS_NAME) {
                return Err(KajiError::RelativeNotManifest(line));
            }
            base = Some(prj_dir.to_path_buf());
        } else if line.starts_with(MAIN_SEPARATOR) {
            // explicit package-root anchor
            line = line.trim_start_matches(MAIN_SEPARATOR).to_owned();
            entry = if line.starts_with(XPKGS_DIRNAME) {
                Provenance::ExternalPkg
            } else {
                Provenance::Pkg
            };
            base = Some(ws.pkg_root.clone());
        } else if line.starts_with(XPKGS_DIRNAME) {
            entry = Provenance::ExternalPkg;
        }

        // expand any embedded env vars that did not start the entry
        line = expand::expand_env(&line)?;

        // split off an optional include/exclude source-file list
        let mut filter = None;
        let orgline = line.clone();
        let split = line.split_once(' ').map(|(d, l)| (d.to_owned(), l.to_owned()));
        if let Some((dir_tok, list)) = split {
            let mut tokens = list.split_whitespace();
            let mode = match tokens.next() {
                Some("<") => FilterMode::Include,
                Some(">") => FilterMode::Exclude,
                _ => return Err(KajiError::MalformedFileFilter(orgline)),
            };
            let files: Vec<String> = tokens.map(str::to_owned).collect();
            if files.is_empty() {
                return Err(KajiError::MalformedFileFilter(orgline));
            }
            filter = Some(FileFilter { mode, files });
            line = dir_tok;
        }

        // trap nested manifests
        if line.ends_with(LIBDIRS_NAME) {
            let fname = match base {
                Some(b) => b.join(&line),
                None => ws.pkg_root.join(&line),
            };
            if !fname.is_file() {
                return Err(KajiError::MissingNestedManifest(line));
            }
            if verbose {
                eprintln!("{}", format!("# nested manifest: {}", fname.display()).dimmed());
            }
            walk_manifest(ws, prj_dir, &fname, entry, variant, verbose, resolved, ancestry)?;
            continue;
        }

        resolved.entries.push(DirEntry {
            path: line.clone(),
            provenance: entry,
            filter,
        });
        resolved.names.push(line);
    }

    ancestry.pop();
    Ok(())
}

fn matches_variant(filter: &str, variant: &str) -> bool {
    filter.split('|').any(|t| t.trim() == variant)
}

/// Duplicate paths fail the whole resolution. With the override set they
/// are downgraded to warnings and the first-seen entry wins.
fn check_duplicates(resolved: &mut ResolvedDirs, allow_duplicates: bool) -> Result<()> {
    let mut duplicates: Vec<&str> = Vec::new();
    for (i, name) in resolved.names.iter().enumerate() {
        let repeated = resolved.names.iter().filter(|n| *n == name).count() > 1;
        let first_hit = resolved.names.iter().position(|n| n == name) == Some(i);
        if repeated && first_hit {
            duplicates.push(name);
        }
    }
    if duplicates.is_empty() {
        return Ok(());
    }

    if !allow_duplicates {
        return Err(KajiError::DuplicateEntries(duplicates.join(", ")));
    }

    for d in &duplicates {
        eprintln!("{} duplicate libdirs entry: {}", "!".yellow(), d);
    }
    // keep the first-seen entry's classification
    let mut seen: Vec<String> = Vec::new();
    resolved.entries.retain(|e| {
        if seen.contains(&e.path) {
            false
        } else {
            seen.push(e.path.clone());
            true
        }
    });
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp:    TempDir,
        ws:      Workspace,
        prj_dir: PathBuf,
    }

    /// Lay out a package tree with a project dir holding the root manifest.
    fn fixture(root_manifest: &str) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let pkg_root = tmp.path().join("pkg");
        let prj_dir = pkg_root.join("projects").join("app");
        fs::create_dir_all(&prj_dir).unwrap();
        fs::write(prj_dir.join(LIBDIRS_NAME), root_manifest).unwrap();

        let ws = Workspace {
            work_root:  tmp.path().to_path_buf(),
            pkg_root:   pkg_root.clone(),
            xpkgs_root: tmp.path().join(XPKGS_DIRNAME),
        };
        Fixture { _tmp: tmp, ws, prj_dir }
    }

    fn resolve(fx: &Fixture, variant: &str) -> Result<ResolvedDirs> {
        resolve_libdirs(&fx.ws, &fx.prj_dir, variant, false, false)
    }

    fn paths(r: &ResolvedDirs) -> Vec<&str> {
        r.entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn empty_manifest_resolves_to_empty_list() {
        let fx = fixture("\n# only a comment\n\n");
        let r = resolve(&fx, "host").unwrap();
        assert_eq!(r.entries, vec![]);
        assert_eq!(r.names, Vec::<String>::new());
    }

    #[test]
    fn classification_covers_all_provenances() {
        std::env::set_var("KAJI_TEST_MF_ABS", "/opt/vendor");
        let fx = fixture(
            "src/engine\n\
             xpkgs/catch2/src\n\
             /src/core\n\
             /xpkgs/hal\n\
             $KAJI_TEST_MF_ABS$/lib\n",
        );
        let r = resolve(&fx, "host").unwrap();
        let got: Vec<Provenance> = r.entries.iter().map(|e| e.provenance).collect();
        assert_eq!(
            got,
            vec![
                Provenance::Local,
                Provenance::ExternalPkg,
                Provenance::Pkg,
                Provenance::ExternalPkg,
                Provenance::Absolute,
            ]
        );
        // leading separator stripped, env var expanded in place
        assert_eq!(r.entries[2].path, standardize_dir_sep("src/core"));
        assert_eq!(r.entries[4].path, standardize_dir_sep("/opt/vendor/lib"));
    }

    #[test]
    fn variant_filter_selects_and_strips() {
        let fx = fixture("[a|b] src/only_ab\nsrc/always\n");
        let r = resolve(&fx, "a").unwrap();
        assert_eq!(paths(&r), vec![standardize_dir_sep("src/only_ab"), standardize_dir_sep("src/always")]);

        let r = resolve(&fx, "z").unwrap();
        assert_eq!(paths(&r), vec![standardize_dir_sep("src/always")]);
    }

    #[test]
    fn malformed_variant_filter_is_fatal() {
        let fx = fixture("[a|b src/broken\n");
        let err = resolve(&fx, "a").unwrap_err();
        assert!(matches!(err, KajiError::MalformedVariantFilter(_)));
    }

    #[test]
    fn include_and_exclude_lists_are_parsed() {
        let fx = fixture("src/engine < main.cpp init.cpp\nsrc/hal > slow.cpp\n");
        let r = resolve(&fx, "host").unwrap();
        assert_eq!(
            r.entries[0].filter,
            Some(FileFilter {
                mode:  FilterMode::Include,
                files: vec!["main.cpp".into(), "init.cpp".into()],
            })
        );
        assert_eq!(
            r.entries[1].filter,
            Some(FileFilter {
                mode:  FilterMode::Exclude,
                files: vec!["slow.cpp".into()],
            })
        );
    }

    #[test]
    fn malformed_file_list_is_fatal() {
        let fx = fixture("src/engine main.cpp\n");
        let err = resolve(&fx, "host").unwrap_err();
        assert!(matches!(err, KajiError::MalformedFileFilter(_)));
    }

    #[test]
    fn nested_manifest_splices_in_order() {
        let fx = fixture("src/first\n./nested/libdirs.kaji\nsrc/last\n");
        let nested_dir = fx.prj_dir.join("nested");
        fs::create_dir_all(&nested_dir).unwrap();
        fs::write(nested_dir.join(LIBDIRS_NAME), "src/middle_a\nsrc/middle_b\n").unwrap();

        let r = resolve(&fx, "host").unwrap();
        assert_eq!(
            paths(&r),
            vec![
                standardize_dir_sep("src/first"),
                standardize_dir_sep("src/middle_a"),
                standardize_dir_sep("src/middle_b"),
                standardize_dir_sep("src/last"),
            ]
        );
    }

    #[test]
    fn nested_manifest_inherits_external_classification() {
        let fx = fixture("xpkgs/hal/libdirs.kaji\n");
        let nested_dir = fx.ws.pkg_root.join(XPKGS_DIRNAME).join("hal");
        fs::create_dir_all(&nested_dir).unwrap();
        fs::write(nested_dir.join(LIBDIRS_NAME), "drivers/uart\n").unwrap();

        let r = resolve(&fx, "host").unwrap();
        assert_eq!(r.entries[0].provenance, Provenance::ExternalPkg);
        assert_eq!(r.entries[0].path, standardize_dir_sep("drivers/uart"));
    }

    #[test]
    fn missing_nested_manifest_is_fatal() {
        let fx = fixture("./nowhere/libdirs.kaji\n");
        let err = resolve(&fx, "host").unwrap_err();
        assert!(matches!(err, KajiError::MissingNestedManifest(_)));
    }

    #[test]
    fn relative_reference_must_name_a_manifest() {
        let fx = fixture("./src/engine\n");
        let err = resolve(&fx, "host").unwrap_err();
        assert!(matches!(err, KajiError::RelativeNotManifest(_)));
    }

    #[test]
    fn self_including_manifest_reports_a_cycle() {
        let fx = fixture("./libdirs.kaji\n");
        let err = resolve(&fx, "host").unwrap_err();
        assert!(matches!(err, KajiError::ManifestCycle(_)));
    }

    #[test]
    fn duplicates_are_fatal_by_default() {
        let fx = fixture("src/engine\nsrc/other\nsrc/engine\n");
        let err = resolve(&fx, "host").unwrap_err();
        match err {
            KajiError::DuplicateEntries(list) => {
                assert!(list.contains(&standardize_dir_sep("src/engine")))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_override_keeps_first_classification() {
        let fx = fixture("/src/engine\nsrc/engine\n");
        let r = resolve_libdirs(&fx.ws, &fx.prj_dir, "host", true, false).unwrap();
        // both occurrences stay in the name list
        assert_eq!(r.names.len(), 2);
        // a single entry survives, classified by the first occurrence
        assert_eq!(r.entries.len(), 1);
        assert_eq!(r.entries[0].provenance, Provenance::Pkg);
    }

    #[test]
    fn resolution_is_deterministic() {
        let fx = fixture("src/a\nxpkgs/b\n[v] src/c\n");
        let one = resolve(&fx, "v").unwrap();
        let two = resolve(&fx, "v").unwrap();
        assert_eq!(one, two);
    }

    #[test]
    fn src_path_and_obj_subdir_follow_provenance() {
        let fx = fixture("");
        let local = DirEntry {
            path: standardize_dir_sep("src/engine"),
            provenance: Provenance::Local,
            filter: None,
        };
        assert_eq!(local.src_path(&fx.ws), fx.ws.pkg_root.join("src").join("engine"));
        assert_eq!(local.obj_subdir(), Path::new("src").join("engine"));

        let xpkg = DirEntry {
            path: standardize_dir_sep("xpkgs/catch2/src"),
            provenance: Provenance::ExternalPkg,
            filter: None,
        };
        assert_eq!(xpkg.src_path(&fx.ws), fx.ws.xpkgs_root.join("catch2").join("src"));

        let abs = DirEntry {
            path: standardize_dir_sep("/opt/vendor/lib"),
            provenance: Provenance::Absolute,
            filter: None,
        };
        assert_eq!(
            abs.obj_subdir(),
            Path::new("__abs").join("opt").join("vendor").join("lib")
        );
    }
}
