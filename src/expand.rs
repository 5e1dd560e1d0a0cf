// ─────────────────────────────────────────────────────────────────────────────
//  kaji :: expand  —  placeholder expansion for flag and object strings
//
//  Three marker forms are understood:
//
//    $NAME$                 value of the environment variable NAME
//    _BUILT_DIR_.<dir>      space-joined object files built for <dir>
//    _BUILD_VARIANT_DIR_    the active build-variant name
//
//  Expansion is strictly left-to-right and repeats until no marker remains;
//  a fully expanded string is a fixed point, so re-expanding is a no-op.
// ─────────────────────────────────────────────────────────────────────────────

use std::env;

use crate::error::{KajiError, Result};
use crate::workspace::standardize_dir_sep;

pub const ENV_MARKER: char = '$';
pub const BUILT_DIR_MARKER: &str = "_BUILT_DIR_.";
pub const VARIANT_MARKER: &str = "_BUILD_VARIANT_DIR_";

/// A directory that has produced build outputs, recorded as the build
/// progresses so later entries can reference its objects.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltDir {
    pub dir:     String,
    pub objects: Vec<String>,
}

// ── Environment variables ─────────────────────────────────────────────────────

/// Replace every `$NAME$` pair in `line` with the variable's value.
///
/// Values are themselves re-scanned, matching the recursive behavior of
/// nested references. An unset variable or a missing closing marker is fatal.
pub fn expand_env(line: &str) -> Result<String> {
    let Some(start) = line.find(ENV_MARKER) else {
        return Ok(line.to_owned());
    };
    let Some(off) = line[start + 1..].find(ENV_MARKER) else {
        return Err(KajiError::UnterminatedVariable {
            marker: ENV_MARKER,
            line:   line.to_owned(),
        });
    };
    let end = start + 1 + off;
    let name = &line[start + 1..end];
    let value = env::var(name).map_err(|_| KajiError::UnsetVariable {
        name: name.to_owned(),
        line: line.to_owned(),
    })?;

    let replaced = format!("{}{}{}", &line[..start], value, &line[end + 1..]);
    expand_env(&replaced)
}

// ── Cross-directory object references ─────────────────────────────────────────

/// Replace every `_BUILT_DIR_.<dir>` token with the space-joined object
/// list of the matching built directory. The directory token runs up to the
/// next space (or end of string); trailing tokens are preserved.
pub fn expand_built_dirs(objects_string: &str, built: &[BuiltDir]) -> Result<String> {
    let normalized = standardize_dir_sep(objects_string);
    if !normalized.contains(BUILT_DIR_MARKER) {
        return Ok(normalized);
    }

    let mut out = String::new();
    let mut source = normalized.trim().to_owned();
    loop {
        let (before, after) = source
            .split_once(BUILT_DIR_MARKER)
            .ok_or_else(|| KajiError::DanglingBuiltDir(normalized.clone()))?;
        out.push_str(before);

        let (dir_tok, tail) = match after.split_once(' ') {
            Some((d, t)) => (d, Some(t)),
            None => (after, None),
        };
        if dir_tok.is_empty() {
            return Err(KajiError::DanglingBuiltDir(normalized.clone()));
        }

        let hit = built
            .iter()
            .find(|b| standardize_dir_sep(&b.dir) == dir_tok)
            .ok_or_else(|| KajiError::UnknownBuiltDir {
                name: dir_tok.to_owned(),
                line: normalized.clone(),
            })?;
        out.push_str(&hit.objects.join(" "));

        match tail {
            None => return Ok(out),
            Some(t) if !t.contains(BUILT_DIR_MARKER) => {
                out.push(' ');
                out.push_str(t);
                return Ok(out);
            }
            Some(t) => {
                out.push(' ');
                source = t.to_owned();
            }
        }
    }
}

// ── Variant name ──────────────────────────────────────────────────────────────

/// Replace `_BUILD_VARIANT_DIR_` with the active variant name. The marker
/// cannot nest, so a plain substring replace suffices.
pub fn expand_variant(source: &str, variant: &str) -> String {
    if !source.contains(VARIANT_MARKER) {
        return source.to_owned();
    }
    source.replace(VARIANT_MARKER, variant)
}

// ── Composition ───────────────────────────────────────────────────────────────

/// Run all three expansions left-to-right. Idempotent on expanded strings.
pub fn expand_all(source: &str, built: &[BuiltDir], variant: &str) -> Result<String> {
    let s = expand_env(source)?;
    let s = expand_built_dirs(&s, built)?;
    Ok(expand_variant(&s, variant))
}

// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn built_fixture() -> Vec<BuiltDir> {
        vec![
            BuiltDir {
                dir:     standardize_dir_sep("foo/bar"),
                objects: vec!["a.o".into(), "b.o".into()],
            },
            BuiltDir {
                dir:     "baz".into(),
                objects: vec!["z.o".into()],
            },
        ]
    }

    #[test]
    fn env_expansion_substitutes_and_recurses() {
        env::set_var("KAJI_TEST_EX_FOO", "hello");
        assert_eq!(expand_env("$KAJI_TEST_EX_FOO$/world").unwrap(), "hello/world");

        env::set_var("KAJI_TEST_EX_A", "x");
        env::set_var("KAJI_TEST_EX_B", "y");
        assert_eq!(
            expand_env("$KAJI_TEST_EX_A$-$KAJI_TEST_EX_B$").unwrap(),
            "x-y"
        );
    }

    #[test]
    fn env_expansion_fails_on_unset_variable() {
        let err = expand_env("$KAJI_TEST_EX_UNSET$/x").unwrap_err();
        match err {
            KajiError::UnsetVariable { name, line } => {
                assert_eq!(name, "KAJI_TEST_EX_UNSET");
                assert_eq!(line, "$KAJI_TEST_EX_UNSET$/x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_expansion_fails_on_missing_trailing_marker() {
        let err = expand_env("flag $DANGLING").unwrap_err();
        assert!(matches!(err, KajiError::UnterminatedVariable { .. }));
    }

    #[test]
    fn built_dir_reference_expands_to_object_list() {
        let built = built_fixture();
        let input = format!("{}foo/bar extra.o", BUILT_DIR_MARKER);
        assert_eq!(
            expand_built_dirs(&input, &built).unwrap(),
            "a.o b.o extra.o"
        );
    }

    #[test]
    fn built_dir_reference_preserves_leading_tokens() {
        let built = built_fixture();
        let input = format!("first.o {}baz", BUILT_DIR_MARKER);
        assert_eq!(expand_built_dirs(&input, &built).unwrap(), "first.o z.o");
    }

    #[test]
    fn multiple_built_dir_references_in_one_string() {
        let built = built_fixture();
        let input = format!("{}foo/bar {}baz", BUILT_DIR_MARKER, BUILT_DIR_MARKER);
        assert_eq!(expand_built_dirs(&input, &built).unwrap(), "a.o b.o z.o");
    }

    #[test]
    fn unknown_built_dir_reference_is_fatal() {
        let err = expand_built_dirs("_BUILT_DIR_.nope", &built_fixture()).unwrap_err();
        match err {
            KajiError::UnknownBuiltDir { name, .. } => assert_eq!(name, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn variant_marker_is_replaced_literally() {
        assert_eq!(
            expand_variant("out/_BUILD_VARIANT_DIR_/lib.a", "host64"),
            "out/host64/lib.a"
        );
        assert_eq!(expand_variant("untouched", "host64"), "untouched");
    }

    #[test]
    fn expansion_is_idempotent() {
        env::set_var("KAJI_TEST_EX_IDEM", "val");
        let built = built_fixture();
        let once = expand_all("$KAJI_TEST_EX_IDEM$ _BUILT_DIR_.baz _BUILD_VARIANT_DIR_", &built, "v1")
            .unwrap();
        let twice = expand_all(&once, &built, "v1").unwrap();
        assert_eq!(once, twice);
    }
}
