// ─────────────────────────────────────────────────────────────────────────────
//  kaji_core  —  public library API
//
//  Package-oriented build orchestration: resolve a project's directory-list
//  manifests into an ordered build set, merge per-variant option bundles,
//  expand placeholder symbols, run pre-process hooks and drive a pluggable
//  toolchain backend.
// ─────────────────────────────────────────────────────────────────────────────

pub mod driver;
pub mod error;
pub mod expand;
pub mod hooks;
pub mod manifest;
pub mod options;
pub mod project;
pub mod sources;
pub mod toolchain;
pub mod workspace;

pub use driver::{BuildDriver, BuildRequest};
pub use error::{KajiError, Result};
pub use expand::BuiltDir;
pub use hooks::{CleanScope, HookAction, ShellRunner, SystemShell};
pub use manifest::{DirEntry, FileFilter, FilterMode, Provenance, ResolvedDirs};
pub use options::{BuildMode, BuildValues, VariantOptions};
pub use project::ProjectConfig;
pub use toolchain::{BuildContext, HostGcc, Toolchain};
pub use workspace::Workspace;
