// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: project  —  per-project configuration (kaji.toml)
//
//  Lives in the project build directory, next to the root libdirs.kaji.
//
//  kaji.toml format:
//
//      [project]
//      name               = "blinky"        # final output stem
//      default_variant    = "host64"
//      pre_process_script = "preprocess.sh" # optional per-directory hook
//      pre_process_args   = "--fast"        # optional, appended verbatim
//
//      [variants.host64.base]
//      cflags = "-m64 -std=c++17 -Wall"
//      inc    = "src xpkgs/catch2/src"
//
//      [variants.host64.optimized]
//      cflags = "-O3"
//
//      [variants.host64.debug]
//      cflags = "-g -O0"
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{KajiError, Result};
use crate::options::{select_variant, VariantOptions};

/// Configuration filename looked up in the project build directory.
pub const CONFIG_NAME: &str = "kaji.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub project: ProjectMeta,
    #[serde(default)]
    pub variants: BTreeMap<String, VariantOptions>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectMeta {
    /// Stem of the final linked output.
    pub name: String,
    /// Variant used when the CLI does not name one.
    pub default_variant: Option<String>,
    /// Per-directory pre-process hook script name.
    pub pre_process_script: Option<String>,
    /// Extra arguments appended to every hook invocation.
    #[serde(default)]
    pub pre_process_args: String,
}

impl ProjectConfig {
    /// Load `kaji.toml` from a project build directory.
    pub fn load(prj_dir: &Path) -> Result<Self> {
        let path = prj_dir.join(CONFIG_NAME);
        if !path.is_file() {
            return Err(KajiError::MissingConfig(prj_dir.display().to_string()));
        }
        let raw = fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| KajiError::MalformedConfig {
            path:   path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Options for `name`, failing with the list of valid variants.
    pub fn variant(&self, name: &str) -> Result<&VariantOptions> {
        select_variant(&self.variants, name)
    }

    /// The variant to build: an explicit request wins over the default.
    pub fn pick_variant<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        requested
            .or(self.project.default_variant.as_deref())
            .ok_or_else(|| KajiError::UnknownVariant {
                requested: "<none>".to_owned(),
                valid:     self.variants.keys().cloned().collect::<Vec<_>>().join(", "),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
