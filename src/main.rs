// ─────────────────────────────────────────────────────────────────────────────
//  kaji  —  package-oriented build orchestrator
//
//  USAGE
//  ─────
//    kaji build   [--variant host64] [--debug] [DIR]
//    kaji clean   [--variant host64] [--local --pkg --xpkgs --absolute] [DIR]
//    kaji resolve [--variant host64] [--json] [DIR]
//
//  DIR is the project build directory (default: current directory). It must
//  contain kaji.toml and the root libdirs.kaji.
// ─────────────────────────────────────────────────────────────────────────────

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use kaji_core::workspace::ScopedDir;
use kaji_core::{
    BuildDriver, BuildMode, BuildRequest, CleanScope, HostGcc, ProjectConfig, ResolvedDirs,
    SystemShell, Workspace,
};

// ─────────────────────────────────────────────────────────────────────────────
//  CLI definition (clap derive)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name    = "kaji",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Package-oriented build orchestrator",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Print resolution and toolchain commands
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve the build set and compile + link the project
    Build(BuildArgs),
    /// Remove derived outputs (and run clean hooks)
    Clean(CleanArgs),
    /// Resolve and print the build set without building
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Build variant (default: the project's default_variant)
    #[arg(long, short = 'b')]
    variant: Option<String>,

    /// Downgrade duplicate manifest entries to warnings
    #[arg(long)]
    allow_duplicates: bool,

    /// Project build directory
    #[arg(default_value = ".")]
    dir: PathBuf,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Build with the debug option bundle instead of optimized
    #[arg(long, short = 'g')]
    debug: bool,
}

#[derive(Args)]
struct CleanArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Clean directories local to the package
    #[arg(long)]
    local: bool,

    /// Clean package-root anchored directories
    #[arg(long)]
    pkg: bool,

    /// Clean external-package directories
    #[arg(long)]
    xpkgs: bool,

    /// Clean absolute-path directories
    #[arg(long)]
    absolute: bool,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Emit the resolved build set as JSON
    #[arg(long)]
    json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
//  Entry point
// ─────────────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match cli.command {
        Cmd::Build(args)   => cmd_build(args, cli.verbose),
        Cmd::Clean(args)   => cmd_clean(args, cli.verbose),
        Cmd::Resolve(args) => cmd_resolve(args, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
//  Command handlers
// ─────────────────────────────────────────────────────────────────────────────

fn make_driver<'a>(
    common: &CommonArgs,
    toolchain: &'a HostGcc,
    shell: &'a SystemShell,
) -> anyhow::Result<BuildDriver<'a>> {
    let ws = Workspace::from_env()?;
    let prj_dir = common
        .dir
        .canonicalize()
        .with_context(|| format!("cannot open project directory {}", common.dir.display()))?;
    let config = ProjectConfig::load(&prj_dir)?;
    Ok(BuildDriver::new(ws, prj_dir, config, toolchain, shell))
}

fn request<'a>(common: &'a CommonArgs, mode: BuildMode, verbose: bool) -> BuildRequest<'a> {
    BuildRequest {
        variant: common.variant.as_deref(),
        mode,
        allow_duplicates: common.allow_duplicates,
        verbose,
    }
}

fn cmd_build(args: BuildArgs, verbose: bool) -> anyhow::Result<()> {
    let toolchain = HostGcc::default();
    let shell = SystemShell;
    let driver = make_driver(&args.common, &toolchain, &shell)?;

    let mode = if args.debug { BuildMode::Debug } else { BuildMode::Optimized };
    let req = request(&args.common, mode, verbose);

    println!(
        "{} {} {}",
        "Building".cyan().bold(),
        driver.config.project.name,
        format!("[{}]", mode.as_str()).dimmed(),
    );

    let _cwd = ScopedDir::push(&driver.prj_dir)?;
    let out = driver.build(&req)?;
    println!("{} {}", "✓".green().bold(), out.display());
    Ok(())
}

fn cmd_clean(args: CleanArgs, verbose: bool) -> anyhow::Result<()> {
    let toolchain = HostGcc::default();
    let shell = SystemShell;
    let driver = make_driver(&args.common, &toolchain, &shell)?;
    let req = request(&args.common, BuildMode::Optimized, verbose);

    // no explicit selection means clean everything
    let scope = if args.local || args.pkg || args.xpkgs || args.absolute {
        CleanScope {
            local:    args.local,
            pkg:      args.pkg,
            xpkgs:    args.xpkgs,
            absolute: args.absolute,
        }
    } else {
        CleanScope::all()
    };

    let _cwd = ScopedDir::push(&driver.prj_dir)?;
    driver.clean(&req, scope)?;
    println!("{} cleaned {}", "✓".green().bold(), driver.config.project.name);
    Ok(())
}

fn cmd_resolve(args: ResolveArgs, verbose: bool) -> anyhow::Result<()> {
    let toolchain = HostGcc::default();
    let shell = SystemShell;
    let driver = make_driver(&args.common, &toolchain, &shell)?;
    let req = request(&args.common, BuildMode::Optimized, verbose);

    let resolved = driver.resolve(&req)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved.entries)?);
    } else {
        print_resolved(&resolved);
    }
    Ok(())
}

fn print_resolved(resolved: &ResolvedDirs) {
    if resolved.entries.is_empty() {
        println!("{} build set is empty", "!".yellow());
        return;
    }

    println!("{:<10} {:<40} {}", "KIND", "DIRECTORY", "FILTER");
    println!("{}", "─".repeat(70).dimmed());
    for e in &resolved.entries {
        let filter = match &e.filter {
            None => String::from("—"),
            Some(f) => {
                let mark = match f.mode {
                    kaji_core::FilterMode::Include => "<",
                    kaji_core::FilterMode::Exclude => ">",
                };
                format!("{} {}", mark, f.files.join(" "))
            }
        };
        println!("{:<10} {:<40} {}", e.provenance.to_string(), e.path, filter);
    }
}
