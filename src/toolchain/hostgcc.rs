// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: toolchain :: hostgcc  —  host gcc/g++ reference backend
//
//  Compiles each resolved directory's translation units in parallel and
//  links a console executable. Flag placement:
//
//      .c     →  gcc  -c  <inc> <c_only_flags> <cflags>
//      .cpp   →  g++  -c  <inc> <cflags> <cppflags>
//      .s/.S  →  gcc  -c  <asminc> <asmflags> -x assembler-with-cpp
//      link   →  g++  <linkflags> <firstobjs> <objects> <lastobjs> <linklibs>
// ─────────────────────────────────────────────────────────────────────────────

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use rayon::prelude::*;

use crate::error::{KajiError, Result};
use crate::manifest::DirEntry;
use crate::toolchain::{BuildContext, Toolchain};

pub struct HostGcc {
    cc:  String,
    cxx: String,
}

impl Default for HostGcc {
    fn default() -> Self {
        Self { cc: "gcc".to_owned(), cxx: "g++".to_owned() }
    }
}

impl HostGcc {
    pub fn new(cc: impl Into<String>, cxx: impl Into<String>) -> Self {
        Self { cc: cc.into(), cxx: cxx.into() }
    }

    fn compile_one(
        &self,
        ctx: &BuildContext<'_>,
        src: &Path,
        obj: &Path,
    ) -> std::result::Result<(), String> {
        let ext = src.extension().and_then(|e| e.to_str()).unwrap_or("");
        let is_c = ext == "c";
        let is_asm = matches!(ext, "s" | "S");

        let compiler = if is_c || is_asm { &self.cc } else { &self.cxx };
        let mut cmd = Command::new(compiler);

        if is_asm {
            for dir in &ctx.opts.asminc {
                cmd.arg(format!("-I{dir}"));
            }
            cmd.args(&ctx.opts.asmflags);
            cmd.arg("-x").arg("assembler-with-cpp");
        } else {
            for dir in &ctx.opts.inc {
                cmd.arg(format!("-I{dir}"));
            }
            if is_c {
                cmd.args(&ctx.opts.c_only_flags);
                cmd.args(&ctx.opts.cflags);
            } else {
                cmd.args(&ctx.opts.cflags);
                cmd.args(&ctx.opts.cppflags);
            }
        }

        cmd.arg("-c").arg(src).arg("-o").arg(obj);

        if ctx.verbose {
            eprintln!("  [compile] {}", src.display());
        }

        let out = cmd
            .output()
            .map_err(|e| format!("cannot spawn {compiler}: {e}"))?;
        if !out.status.success() {
            return Err(format!(
                "In {}:\n{}",
                src.display(),
                String::from_utf8_lossy(&out.stderr)
            ));
        }
        Ok(())
    }
}

impl Toolchain for HostGcc {
    fn name(&self) -> &'static str {
        "host-gcc"
    }

    fn asm_extensions(&self) -> &[&str] {
        &["s", "S"]
    }

    fn compile_dir(
        &self,
        ctx: &BuildContext<'_>,
        entry: &DirEntry,
        sources: &[String],
    ) -> Result<Vec<String>> {
        let src_dir = entry.src_path(ctx.ws);
        let obj_dir = ctx.build_dir.join(entry.obj_subdir());
        fs::create_dir_all(&obj_dir)?;

        let errors: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let objects: Vec<String> = sources
            .par_iter()
            .map(|name| {
                let src = src_dir.join(name);
                let obj = obj_dir.join(Path::new(name).with_extension("o"));
                if let Err(msg) = self.compile_one(ctx, &src, &obj) {
                    errors.lock().unwrap().push(msg);
                }
                obj.display().to_string()
            })
            .collect();

        let errs = errors.into_inner().unwrap();
        if !errs.is_empty() {
            return Err(KajiError::CompileFailed { output: errs.join("\n\n") });
        }
        Ok(objects)
    }

    fn link(
        &self,
        ctx: &BuildContext<'_>,
        first: &[String],
        objects: &[String],
        last: &[String],
    ) -> Result<()> {
        let out_path = ctx.build_dir.join(ctx.final_name);

        let mut cmd = Command::new(&self.cxx);
        cmd.args(&ctx.opts.linkflags);
        cmd.args(first);
        cmd.args(objects);
        cmd.args(last);
        cmd.args(&ctx.opts.linklibs);
        cmd.arg("-o").arg(&out_path);

        if ctx.verbose {
            eprintln!("  [link] {}", out_path.display());
        }

        let out = cmd.output()?;
        if !out.status.success() {
            return Err(KajiError::LinkFailed {
                output: String::from_utf8_lossy(&out.stderr).to_string(),
            });
        }
        Ok(())
    }

    fn clean(&self, ctx: &BuildContext<'_>) -> Result<()> {
        if ctx.build_dir.is_dir() {
            if ctx.verbose {
                eprintln!("  [clean] {}", ctx.build_dir.display());
            }
            fs::remove_dir_all(&ctx.build_dir)?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn object_paths_mirror_the_source_stems() {
        assert_eq!(
            Path::new("uart.cpp").with_extension("o"),
            PathBuf::from("uart.o")
        );
        assert_eq!(
            Path::new("boot.S").with_extension("o"),
            PathBuf::from("boot.o")
        );
    }
}
