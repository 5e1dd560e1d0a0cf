// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: driver  —  build/clean orchestration
//
//  Sequential pipeline, one invocation at a time:
//
//    roots → manifest walk → duplicate check → per-directory hook +
//    source resolution + compile → first/last object expansion → link
//
//  All state lives in explicit values threaded through the run; nothing
//  survives between invocations.
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use colored::Colorize;

use crate::error::Result;
use crate::expand::{self, BuiltDir};
use crate::hooks::{self, CleanScope, HookAction, HookContext, ShellRunner};
use crate::manifest::{resolve_libdirs, ResolvedDirs};
use crate::options::{BuildMode, BuildValues};
use crate::project::ProjectConfig;
use crate::sources;
use crate::toolchain::{BuildContext, Toolchain};
use crate::workspace::Workspace;

/// Caller-supplied knobs for one invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildRequest<'a> {
    /// Variant to build; falls back to the project default.
    pub variant: Option<&'a str>,
    pub mode: BuildMode,
    /// Downgrade duplicate manifest entries to warnings.
    pub allow_duplicates: bool,
    pub verbose: bool,
}

pub struct BuildDriver<'a> {
    pub ws:      Workspace,
    pub prj_dir: PathBuf,
    pub config:  ProjectConfig,
    toolchain:   &'a dyn Toolchain,
    shell:       &'a dyn ShellRunner,
}

impl<'a> BuildDriver<'a> {
    pub fn new(
        ws: Workspace,
        prj_dir: PathBuf,
        config: ProjectConfig,
        toolchain: &'a dyn Toolchain,
        shell: &'a dyn ShellRunner,
    ) -> Self {
        Self { ws, prj_dir, config, toolchain, shell }
    }

    /// Manifest resolution only — what `kaji resolve` prints.
    pub fn resolve(&self, req: &BuildRequest<'_>) -> Result<ResolvedDirs> {
        let variant = self.config.pick_variant(req.variant)?;
        // an unknown variant should fail even when no line filters on it
        self.config.variant(variant)?;
        resolve_libdirs(&self.ws, &self.prj_dir, variant, req.allow_duplicates, req.verbose)
    }

    /// Full build: returns the path of the linked output.
    pub fn build(&self, req: &BuildRequest<'_>) -> Result<PathBuf> {
        let variant = self.config.pick_variant(req.variant)?;
        let merged = self.config.variant(variant)?.merge(req.mode);
        let opts = expand_flag_fields(merged, variant)?;

        let resolved =
            resolve_libdirs(&self.ws, &self.prj_dir, variant, req.allow_duplicates, req.verbose)?;

        let build_dir = self.prj_dir.join(variant);
        fs::create_dir_all(&build_dir)?;

        let ctx = BuildContext {
            ws:         &self.ws,
            prj_dir:    &self.prj_dir,
            build_dir,
            variant,
            mode:       req.mode,
            opts,
            final_name: &self.config.project.name,
            verbose:    req.verbose,
        };
        let hook_ctx = self.hook_context(variant, req);

        let mut built: Vec<BuiltDir> = Vec::new();
        for entry in &resolved.entries {
            let src_dir = entry.src_path(&self.ws);
            hooks::run_pre_process(self.shell, &hook_ctx, &src_dir, HookAction::Build)?;

            println!("{} {} ({})", "= Building:".cyan(), entry.path, entry.provenance);
            let files = sources::files_to_build(&src_dir, self.toolchain.asm_extensions())?;
            let files = sources::apply_filter(files, entry.filter.as_ref());
            let objects = self.toolchain.compile_dir(&ctx, entry, &files)?;

            built.push(BuiltDir { dir: entry.path.clone(), objects });
        }

        let first = expand_obj_list(&ctx.opts.firstobjs, &built, variant)?;
        let last = expand_obj_list(&ctx.opts.lastobjs, &built, variant)?;

        // bulk list: everything built that is not already pinned first/last
        let pinned: HashSet<&String> = first.iter().chain(last.iter()).collect();
        let objects: Vec<String> = built
            .iter()
            .flat_map(|b| b.objects.iter())
            .filter(|o| !pinned.contains(o))
            .cloned()
            .collect();

        self.toolchain.link(&ctx, &first, &objects, &last)?;
        Ok(ctx.build_dir.join(&self.config.project.name))
    }

    /// Clean: provenance-scoped hook pass, then derived-output removal.
    pub fn clean(&self, req: &BuildRequest<'_>, scope: CleanScope) -> Result<()> {
        let variant = self.config.pick_variant(req.variant)?;
        let opts = self.config.variant(variant)?.merge(req.mode);

        let resolved =
            resolve_libdirs(&self.ws, &self.prj_dir, variant, req.allow_duplicates, req.verbose)?;

        let hook_ctx = self.hook_context(variant, req);
        hooks::run_clean_pre_processing(self.shell, &hook_ctx, &resolved.entries, scope)?;

        let ctx = BuildContext {
            ws:         &self.ws,
            prj_dir:    &self.prj_dir,
            build_dir:  self.prj_dir.join(variant),
            variant,
            mode:       req.mode,
            opts,
            final_name: &self.config.project.name,
            verbose:    req.verbose,
        };
        self.toolchain.clean(&ctx)
    }

    fn hook_context<'b>(&'b self, variant: &'b str, req: &BuildRequest<'_>) -> HookContext<'b> {
        HookContext {
            ws:         &self.ws,
            prj_dir:    &self.prj_dir,
            script:     self.config.project.pre_process_script.as_deref(),
            extra_args: &self.config.project.pre_process_args,
            variant,
            mode:       req.mode,
            verbose:    req.verbose,
        }
    }
}

// ── Expansion helpers ─────────────────────────────────────────────────────────

/// Expand env and variant markers in every flag field. The first/last object
/// lists are left alone here — they may reference built directories and are
/// expanded after compilation.
fn expand_flag_fields(mut opts: BuildValues, variant: &str) -> Result<BuildValues> {
    for field in [
        &mut opts.inc,
        &mut opts.asminc,
        &mut opts.c_only_flags,
        &mut opts.cflags,
        &mut opts.cppflags,
        &mut opts.asmflags,
        &mut opts.linkflags,
        &mut opts.linklibs,
    ] {
        for token in field.iter_mut() {
            let expanded = expand::expand_env(token)?;
            *token = expand::expand_variant(&expanded, variant);
        }
    }
    Ok(opts)
}

/// Expand an object-list token sequence, resolving built-directory
/// references, and re-tokenize the result.
fn expand_obj_list(tokens: &[String], built: &[BuiltDir], variant: &str) -> Result<Vec<String>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }
    let expanded = expand::expand_all(&tokens.join(" "), built, variant)?;
    Ok(expanded.split_whitespace().map(str::to_owned).collect())
}
