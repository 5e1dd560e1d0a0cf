// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: hooks  —  pre-process script invocation
//
//  A project may name a hook script that is run inside every resolved
//  directory that actually contains it, before build and clean actions.
//  Positional argument protocol (fixed, in this order):
//
//      <script> <build|clean> <verbose|terse> <workRoot> <pkgRoot>
//               <prjDir> <currentDir> <variant> <optimized|debug> [extraArgs…]
//
//  A directory without the script is silently skipped. A non-zero exit is
//  fatal and surfaces the captured output. There is deliberately no timeout:
//  a hook that never returns blocks the build (known limitation).
// ─────────────────────────────────────────────────────────────────────────────

use std::path::Path;
use std::process::Command;

use colored::Colorize;

use crate::error::{KajiError, Result};
use crate::manifest::{DirEntry, Provenance};
use crate::options::BuildMode;
use crate::workspace::Workspace;

// ── Shell abstraction ─────────────────────────────────────────────────────────

/// Narrow seam for spawning external processes, so the core never depends
/// on a specific spawning mechanism and tests can substitute a fake.
pub trait ShellRunner {
    /// Run `argv[0]` with the remaining arguments. Returns the exit code
    /// and the captured stdout+stderr.
    fn invoke(&self, argv: &[String]) -> Result<(i32, String)>;
}

/// Production runner backed by `std::process::Command`.
pub struct SystemShell;

impl ShellRunner for SystemShell {
    fn invoke(&self, argv: &[String]) -> Result<(i32, String)> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| KajiError::HookFailed {
                script: String::new(),
                output: "empty hook command".to_owned(),
            })?;

        let out = Command::new(program).args(args).output()?;
        let mut text = String::from_utf8_lossy(&out.stdout).trim_end().to_owned();
        let stderr = String::from_utf8_lossy(&out.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr.trim_end());
        }
        Ok((out.status.code().unwrap_or(-1), text))
    }
}

// ── Hook invocation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    Build,
    Clean,
}

impl HookAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookAction::Build => "build",
            HookAction::Clean => "clean",
        }
    }
}

/// Provenance classes visited by the clean pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanScope {
    pub local:    bool,
    pub pkg:      bool,
    pub xpkgs:    bool,
    pub absolute: bool,
}

impl CleanScope {
    pub fn all() -> Self {
        Self { local: true, pkg: true, xpkgs: true, absolute: true }
    }

    fn selects(&self, provenance: Provenance) -> bool {
        match provenance {
            Provenance::Local       => self.local,
            Provenance::Pkg         => self.pkg,
            Provenance::ExternalPkg => self.xpkgs,
            Provenance::Absolute    => self.absolute,
        }
    }
}

/// Everything a hook invocation needs besides the directory it runs in.
pub struct HookContext<'a> {
    pub ws:        &'a Workspace,
    pub prj_dir:   &'a Path,
    pub script:    Option<&'a str>,
    pub extra_args: &'a str,
    pub variant:   &'a str,
    pub mode:      BuildMode,
    pub verbose:   bool,
}

/// Run the configured pre-process script inside `current_dir`, if both the
/// configuration and the script file are present.
pub fn run_pre_process(
    shell: &dyn ShellRunner,
    ctx: &HookContext<'_>,
    current_dir: &Path,
    action: HookAction,
) -> Result<()> {
    let Some(script_name) = ctx.script else {
        return Ok(());
    };
    let script = current_dir.join(script_name);
    if !script.is_file() {
        return Ok(());
    }

    println!("{} {}", "= Running pre-process script:".cyan(), script_name);

    let mut argv: Vec<String> = vec![
        script.display().to_string(),
        action.as_str().to_owned(),
        if ctx.verbose { "verbose" } else { "terse" }.to_owned(),
        ctx.ws.work_root.display().to_string(),
        ctx.ws.pkg_root.display().to_string(),
        ctx.prj_dir.display().to_string(),
        current_dir.display().to_string(),
        ctx.variant.to_owned(),
        ctx.mode.as_str().to_owned(),
    ];
    argv.extend(ctx.extra_args.split_whitespace().map(str::to_owned));

    if ctx.verbose {
        eprintln!("{}", format!("# pre-process cmd: {}", argv.join(" ")).dimmed());
    }

    let (code, output) = shell.invoke(&argv)?;
    if code != 0 {
        return Err(KajiError::HookFailed {
            script: script_name.to_owned(),
            output,
        });
    }
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Clean-time hook pass over the resolved directory list, visiting only the
/// provenance classes selected by `scope`.
pub fn run_clean_pre_processing(
    shell: &dyn ShellRunner,
    ctx: &HookContext<'_>,
    entries: &[DirEntry],
    scope: CleanScope,
) -> Result<()> {
    if ctx.script.is_none() {
        return Ok(());
    }
    for entry in entries {
        if !scope.selects(entry.provenance) {
            continue;
        }
        run_pre_process(shell, ctx, &entry.src_path(ctx.ws), HookAction::Clean)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
