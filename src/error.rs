// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: error
// ─────────────────────────────────────────────────────────────────────────────

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KajiError {
    #[error("The environment variables KAJI_WORK_ROOT, KAJI_PKG_ROOT and KAJI_XPKGS_ROOT must all be set")]
    MissingRoots,

    #[error("Unknown build variant '{requested}' — valid variants: {valid}")]
    UnknownVariant { requested: String, valid: String },

    #[error("Invalid [<variant>] prefix qualifier ({0})")]
    MalformedVariantFilter(String),

    #[error("Invalid include/exclude syntax in libdirs.kaji, line '{0}'")]
    MalformedFileFilter(String),

    #[error("Using a relative include to a non-libdirs.kaji file ({0})")]
    RelativeNotManifest(String),

    #[error("Missing/invalid nested libdirs.kaji: {0}")]
    MissingNestedManifest(String),

    #[error("Manifest include cycle detected: {0} is already in the include chain")]
    ManifestCycle(String),

    #[error("Duplicate entries in libdirs.kaji: {0}")]
    DuplicateEntries(String),

    #[error("Invalid variable syntax — missing trailing '{marker}' — in line ({line})")]
    UnterminatedVariable { marker: char, line: String },

    #[error("Non-existent environment variable — {name} — referenced in line ({line})")]
    UnsetVariable { name: String, line: String },

    #[error("Cannot find directory entry (in libdirs.kaji) for {name} in string ({line})")]
    UnknownBuiltDir { name: String, line: String },

    #[error("Missing directory reference for _BUILT_DIR_ symbol in string ({0})")]
    DanglingBuiltDir(String),

    #[error("Derived/Built directory '{0}' does not exist\n  Hint: a prior build step likely did not run")]
    DerivedDirMissing(String),

    #[error("Source directory '{0}' does not exist")]
    SourceDirMissing(String),

    #[error("Pre-process script failed ({script}):\n{output}")]
    HookFailed { script: String, output: String },

    #[error("Missing kaji.toml in {0}")]
    MissingConfig(String),

    #[error("Malformed kaji.toml at {path}: {detail}")]
    MalformedConfig { path: String, detail: String },

    #[error("Compilation failed:\n{output}")]
    CompileFailed { output: String },

    #[error("Link failed:\n{output}")]
    LinkFailed { output: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KajiError>;
