// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: toolchain  —  compile/link/clean capability behind the core
//
//  The resolution engine never constructs compiler command lines itself; it
//  hands a backend the merged option bundle, the per-directory source list
//  and the expanded first/last object lists, and gets back pass/fail plus
//  diagnostic text surfaced to the user unmodified.
// ─────────────────────────────────────────────────────────────────────────────

pub mod hostgcc;

pub use hostgcc::HostGcc;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::manifest::DirEntry;
use crate::options::{BuildMode, BuildValues};
use crate::workspace::Workspace;

/// Everything a backend needs for one build invocation.
#[derive(Debug)]
pub struct BuildContext<'a> {
    pub ws:         &'a Workspace,
    pub prj_dir:    &'a Path,
    /// Output tree for this variant, `<prj_dir>/<variant>`.
    pub build_dir:  PathBuf,
    pub variant:    &'a str,
    pub mode:       BuildMode,
    /// Merged option bundle with env/variant markers already expanded.
    pub opts:       BuildValues,
    /// Stem of the final linked output.
    pub final_name: &'a str,
    pub verbose:    bool,
}

/// Abstract compiler/linker family. Concrete backends construct the actual
/// command lines for their tools.
pub trait Toolchain {
    /// Human-readable backend name, for status output.
    fn name(&self) -> &'static str;

    /// Assembly source extensions (no dot) this backend can compile.
    fn asm_extensions(&self) -> &[&str] {
        &[]
    }

    /// Compile the given source files of one resolved directory; returns
    /// the produced object-file paths in source order.
    fn compile_dir(
        &self,
        ctx: &BuildContext<'_>,
        entry: &DirEntry,
        sources: &[String],
    ) -> Result<Vec<String>>;

    /// Link the final output. `first` and `last` wrap the bulk object list
    /// and must keep their positions.
    fn link(
        &self,
        ctx: &BuildContext<'_>,
        first: &[String],
        objects: &[String],
        last: &[String],
    ) -> Result<()>;

    /// Remove this variant's derived outputs.
    fn clean(&self, ctx: &BuildContext<'_>) -> Result<()>;
}
