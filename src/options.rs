// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: options  —  per-variant compiler/linker option bundles
//
//  Every build variant carries three bundles: `base` (always applied),
//  `optimized` and `debug` (one of the two appended on top of base at build
//  time). Each bundle field is an ordered token sequence — order is load
//  bearing for the linker, in particular firstobjs/lastobjs which control
//  static-initialization and self-registration behavior.
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::{KajiError, Result};

/// Deserialize a whitespace-separated flag string into a token sequence,
/// so `cflags = "-m64 -std=c++17"` reads like a compiler invocation line.
fn tokens<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.split_whitespace().map(str::to_owned).collect())
}

/// One option bundle. Any field left out of the config is an empty sequence.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildValues {
    /// C/C++ include search directories.
    #[serde(default, deserialize_with = "tokens")]
    pub inc: Vec<String>,
    /// Assembly include search directories.
    #[serde(default, deserialize_with = "tokens")]
    pub asminc: Vec<String>,
    /// Flags applied to C compiles only.
    #[serde(default, deserialize_with = "tokens")]
    pub c_only_flags: Vec<String>,
    /// Flags applied to both C and C++ compiles.
    #[serde(default, deserialize_with = "tokens")]
    pub cflags: Vec<String>,
    /// Flags applied to C++ compiles only.
    #[serde(default, deserialize_with = "tokens")]
    pub cppflags: Vec<String>,
    /// Flags applied to assembly compiles.
    #[serde(default, deserialize_with = "tokens")]
    pub asmflags: Vec<String>,
    /// Linker flags.
    #[serde(default, deserialize_with = "tokens")]
    pub linkflags: Vec<String>,
    /// Libraries handed to the linker after all objects.
    #[serde(default, deserialize_with = "tokens")]
    pub linklibs: Vec<String>,
    /// Objects linked unconditionally first. Placeholder markers legal.
    #[serde(default, deserialize_with = "tokens")]
    pub firstobjs: Vec<String>,
    /// Objects linked unconditionally last. Placeholder markers legal.
    #[serde(default, deserialize_with = "tokens")]
    pub lastobjs: Vec<String>,
}

impl BuildValues {
    /// Field-wise append of `other` after `self`'s tokens.
    pub fn append(&mut self, other: &BuildValues) {
        self.inc.extend(other.inc.iter().cloned());
        self.asminc.extend(other.asminc.iter().cloned());
        self.c_only_flags.extend(other.c_only_flags.iter().cloned());
        self.cflags.extend(other.cflags.iter().cloned());
        self.cppflags.extend(other.cppflags.iter().cloned());
        self.asmflags.extend(other.asmflags.iter().cloned());
        self.linkflags.extend(other.linkflags.iter().cloned());
        self.linklibs.extend(other.linklibs.iter().cloned());
        self.firstobjs.extend(other.firstobjs.iter().cloned());
        self.lastobjs.extend(other.lastobjs.iter().cloned());
    }
}

/// Whether the `optimized` or `debug` bundle rides on top of `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Optimized,
    Debug,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Optimized => "optimized",
            BuildMode::Debug     => "debug",
        }
    }
}

/// The base/optimized/debug triple configured for one variant.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantOptions {
    #[serde(default)]
    pub base: BuildValues,
    #[serde(default)]
    pub optimized: BuildValues,
    #[serde(default)]
    pub debug: BuildValues,
}

impl VariantOptions {
    /// `base ⊕ (optimized | debug)` — never mutates the configured bundles,
    /// so repeated merges within one process stay independent.
    pub fn merge(&self, mode: BuildMode) -> BuildValues {
        let mut merged = self.base.clone();
        merged.append(match mode {
            BuildMode::Optimized => &self.optimized,
            BuildMode::Debug     => &self.debug,
        });
        merged
    }
}

/// Look up `name` in the configured variant table. An unknown name is a
/// configuration error reported with the full list of valid names.
pub fn select_variant<'a>(
    variants: &'a BTreeMap<String, VariantOptions>,
    name: &str,
) -> Result<&'a VariantOptions> {
    variants.get(name).ok_or_else(|| KajiError::UnknownVariant {
        requested: name.to_owned(),
        valid:     variants.keys().cloned().collect::<Vec<_>>().join(", "),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
