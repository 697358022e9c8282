//! Script sources: inline text, files and file globs.
//!
//! Globs support `*` and `?` in the final path component only, which covers
//! the usual `scripts/*.go` layout without a glob dependency. Matches are
//! read in sorted order, so the combined program does not depend on
//! directory iteration order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// One source registered on the builder.
#[derive(Clone, Debug)]
pub(crate) enum Source {
    Text(String),
    File(PathBuf),
    Glob(String),
}

/// Read every source and join them into one program text.
pub(crate) fn load(sources: &[Source]) -> Result<String> {
    let mut program = String::new();
    let mut files = 0usize;
    for source in sources {
        match source {
            Source::Text(text) => push(&mut program, text),
            Source::File(path) => {
                push(&mut program, &read(path)?);
                files += 1;
            }
            Source::Glob(pattern) => {
                for path in expand(pattern)? {
                    push(&mut program, &read(&path)?);
                    files += 1;
                }
            }
        }
    }
    debug!(sources = sources.len(), files, bytes = program.len(), "loaded sources");
    Ok(program)
}

fn push(program: &mut String, text: &str) {
    if !program.is_empty() && !program.ends_with('\n') {
        program.push('\n');
    }
    program.push_str(text);
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Files matching `pattern`, sorted. No match is not an error.
pub(crate) fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(pattern);
    let Some(name_pattern) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(Vec::new());
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let path = entry.path();
        if wildcard_match(name_pattern, name) && path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    debug!(pattern, matches = matches.len(), "expanded glob");
    Ok(matches)
}

/// Match `name` against a pattern where `*` is any run of characters and
/// `?` is exactly one.
pub(crate) fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    // Position of the last `*` and the name position it is retried from.
    let mut star: Option<(usize, usize)> = None;
    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match star {
                Some((star_p, star_n)) => {
                    p = star_p + 1;
                    n = star_n + 1;
                    star = Some((star_p, star_n + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}
