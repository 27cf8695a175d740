// Copyright (c) 2023, BlockProject 3D
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without modification,
// are permitted provided that the following conditions are met:
//
//     * Redistributions of source code must retain the above copyright notice,
//       this list of conditions and the following disclaimer.
//     * Redistributions in binary form must reproduce the above copyright notice,
//       this list of conditions and the following disclaimer in the documentation
//       and/or other materials provided with the distribution.
//     * Neither the name of BlockProject 3D nor the names of its contributors
//       may be used to endorse or promote products derived from this software
//       without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF
// LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING
// NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE OF THIS
// SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Include resolution pass over a shader source.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::compiler::error::Error;

/// Maximum supported depth of an include chain.
pub const MAX_INCLUDE_DEPTH: usize = 64;

/// The result of the include resolution pass.
#[derive(Debug)]
pub struct Preprocessed {
    /// The source text with all include directives expanded.
    pub text: String,

    /// The transitive set of included files, in first-inclusion order.
    pub includes: Vec<PathBuf>,
}

struct Expander<'a> {
    include_dirs: &'a [PathBuf],
    out: String,
    includes: Vec<PathBuf>,
    visited: BTreeSet<PathBuf>,
}

/// Expands every `#include "name"` directive in `source`.
///
/// Includes resolve against the directory of the including file first, then
/// against `include_dirs` in order. Each file is inlined at most once
/// (include-guard semantics), which also makes include cycles harmless. The
/// transitive include set is recorded for build-dependency tracking.
///
/// # Arguments
///
/// * `source`: the root source text.
/// * `origin`: the path the root source was read from.
/// * `include_dirs`: additional include search directories.
///
/// # Errors
///
/// Returns an [Error](crate::compiler::error::Error) if a directive is
/// malformed, an include cannot be resolved or read, or the include chain is
/// deeper than [MAX_INCLUDE_DEPTH](MAX_INCLUDE_DEPTH).
pub fn preprocess(source: &str, origin: &Path, include_dirs: &[PathBuf]) -> Result<Preprocessed, Error> {
    let mut expander = Expander {
        include_dirs,
        out: String::with_capacity(source.len()),
        includes: Vec::new(),
        visited: BTreeSet::new(),
    };
    expander.expand(source, origin, 0)?;
    Ok(Preprocessed {
        text: expander.out,
        includes: expander.includes,
    })
}

impl<'a> Expander<'a> {
    fn expand(&mut self, text: &str, file: &Path, depth: usize) -> Result<(), Error> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeDepth(depth));
        }
        for line in text.lines() {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix("#include") {
                Some(rest) => self.expand_include(rest, line, file, depth)?,
                None => {
                    self.out.push_str(line);
                    self.out.push('\n');
                },
            }
        }
        Ok(())
    }

    fn expand_include(&mut self, rest: &str, line: &str, file: &Path, depth: usize) -> Result<(), Error> {
        let name = match parse_include_name(rest) {
            Some(v) => v,
            None => return Err(Error::MalformedDirective(line.trim().into())),
        };
        let resolved = match self.resolve(file, name) {
            Some(v) => v,
            None => {
                return Err(Error::IncludeNotFound {
                    name: name.into(),
                    from: file.into(),
                })
            },
        };
        let canonical = resolved.canonicalize()?;
        if !self.visited.insert(canonical) {
            return Ok(());
        }
        let nested = std::fs::read_to_string(&resolved)?;
        self.includes.push(resolved.clone());
        self.expand(&nested, &resolved, depth + 1)
    }

    fn resolve(&self, file: &Path, name: &str) -> Option<PathBuf> {
        let local = file.parent().map(|v| v.join(name));
        if let Some(candidate) = local {
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        for dir in self.include_dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }
}

fn parse_include_name(rest: &str) -> Option<&str> {
    let rest = rest.trim();
    let inner = rest.strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner)
}
