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

//! The single-target shader front end.
//!
//! The [Compile](Compile) trait is the seam between the driver and whatever
//! front end lowers one shader for one target. The built-in
//! [Compiler](Compiler) resolves includes, checks target restrictions and
//! the entry point, and packages the normalized program as portable byte
//! code; a translating front end can replace it behind the same trait.

pub mod error;
pub mod preprocessor;

use std::path::{Path, PathBuf};

use byteorder::{ByteOrder, LittleEndian};

use crate::shader::{Stage, Target};
use crate::utils;
use error::Error;

/// Signature of a portable byte code blob.
pub const BYTE_CODE_SIGNATURE: [u8; 3] = *b"PBC";

/// The supported portable byte code version.
pub const BYTE_CODE_VERSION: u32 = 0x1;

/// Per-compile parameters for one (shader, target) attempt.
///
/// *A fresh instance is built for every target; it is never mutated after
/// construction.*
#[derive(Clone, Debug)]
pub struct SourceOptions {
    /// The target rendering API to lower for.
    pub target: Target,

    /// The shader stage of the source.
    pub stage: Stage,

    /// The entry point name.
    pub entry_point: String,

    /// Additional include search directories.
    pub include_dirs: Vec<PathBuf>,
}

/// The result of one successful compilation attempt.
///
/// *Owned by the caller; never shared across targets.*
#[derive(Debug)]
pub struct CompiledShader {
    /// The shader stage.
    pub stage: Stage,

    /// The entry point name.
    pub entry_point: String,

    /// The normalized program text (intermediate assembly).
    pub assembly: String,

    /// The target-dialect rendition of the program.
    pub native_source: String,

    /// The portable byte code.
    pub byte_code: Vec<u8>,

    /// The transitive set of included files, in first-inclusion order.
    pub includes: Vec<PathBuf>,
}

/// The contract of a single-target shader front end.
pub trait Compile {
    /// Attempts to compile one shader for one target.
    ///
    /// # Arguments
    ///
    /// * `source`: the raw source bytes.
    /// * `source_path`: the path the source was read from (include
    ///   resolution base and diagnostics).
    /// * `options`: the per-compile parameters.
    ///
    /// returns: Result<CompiledShader, Error>
    ///
    /// # Errors
    ///
    /// Returns an [Error](crate::compiler::error::Error) if the source could
    /// not be lowered for the requested target.
    fn compile(
        &self,
        source: &[u8],
        source_path: &Path,
        options: &SourceOptions,
    ) -> Result<CompiledShader, Error>;
}

/// The built-in shader front end.
#[derive(Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Compiler {
        Compiler
    }
}

impl Compile for Compiler {
    fn compile(
        &self,
        source: &[u8],
        source_path: &Path,
        options: &SourceOptions,
    ) -> Result<CompiledShader, Error> {
        let text = std::str::from_utf8(source)?;
        let pre = preprocessor::preprocess(text, source_path, &options.include_dirs)?;
        if let Some(targets) = parse_targets_pragma(&pre.text)? {
            if !targets.contains(&options.target) {
                return Err(Error::UnsupportedTarget(options.target));
            }
        }
        if !defines_entry_point(&pre.text, &options.entry_point) {
            return Err(Error::MissingEntryPoint(options.entry_point.clone()));
        }
        let native_source = render_native_source(&pre.text, options.target);
        let byte_code = encode_byte_code(&pre.text, options);
        Ok(CompiledShader {
            stage: options.stage,
            entry_point: options.entry_point.clone(),
            assembly: pre.text,
            native_source,
            byte_code,
            includes: pre.includes,
        })
    }
}

/// Parses an optional `#pragma targets(a, b, ...)` restriction.
///
/// Returns `None` when the source carries no restriction.
fn parse_targets_pragma(text: &str) -> Result<Option<Vec<Target>>, Error> {
    for line in text.lines() {
        let trimmed = line.trim();
        let rest = match trimmed.strip_prefix("#pragma targets") {
            Some(v) => v.trim(),
            None => continue,
        };
        let inner = rest
            .strip_prefix('(')
            .and_then(|v| v.strip_suffix(')'))
            .ok_or_else(|| Error::MalformedDirective(trimmed.into()))?;
        let mut targets = Vec::new();
        for name in inner.split(',') {
            let name = name.trim();
            match Target::from_name(name) {
                Some(v) => targets.push(v),
                None => return Err(Error::MalformedDirective(trimmed.into())),
            }
        }
        if targets.is_empty() {
            return Err(Error::MalformedDirective(trimmed.into()));
        }
        return Ok(Some(targets));
    }
    Ok(None)
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Checks that `text` defines a function named `entry`.
fn defines_entry_point(text: &str, entry: &str) -> bool {
    if entry.is_empty() {
        return false;
    }
    let bytes = text.as_bytes();
    let mut start = 0;
    while let Some(pos) = text[start..].find(entry) {
        let begin = start + pos;
        let end = begin + entry.len();
        let bounded = (begin == 0 || !is_ident_char(bytes[begin - 1]))
            && (end == bytes.len() || !is_ident_char(bytes[end]));
        if bounded && text[end..].trim_start().starts_with('(') {
            return true;
        }
        start = end;
    }
    false
}

/// Returns the dialect prologue prepended to the native source rendition.
fn dialect_prologue(target: Target) -> &'static str {
    match target {
        Target::Gl40 => "#version 400 core\n",
        Target::Gl41 => "#version 410 core\n",
        Target::Es30 => "#version 300 es\nprecision highp float;\n",
        Target::Es31 => "#version 310 es\nprecision highp float;\n",
        Target::Vk10 | Target::Vk11 | Target::Vk12 => "#version 450 core\n",
        Target::Mt => "// dialect: metal\n",
        Target::Dx11 => "// dialect: hlsl (shader model 5.0)\n",
        Target::Dx12 => "// dialect: hlsl (shader model 6.0)\n",
    }
}

fn render_native_source(assembly: &str, target: Target) -> String {
    let prologue = dialect_prologue(target);
    let mut out = String::with_capacity(prologue.len() + assembly.len());
    out.push_str(prologue);
    out.push_str(assembly);
    out
}

/// Encodes the normalized program as portable byte code.
///
/// Layout (little endian): signature, stage code, version, entry point
/// hash, program length, program bytes. The target is deliberately not part
/// of the blob; the stage pack record that carries the blob identifies it.
fn encode_byte_code(assembly: &str, options: &SourceOptions) -> Vec<u8> {
    let mut buf = Vec::with_capacity(assembly.len() + 20);
    buf.extend_from_slice(&BYTE_CODE_SIGNATURE);
    buf.push(options.stage.code());
    let mut word = [0u8; 4];
    LittleEndian::write_u32(&mut word, BYTE_CODE_VERSION);
    buf.extend_from_slice(&word);
    let mut qword = [0u8; 8];
    LittleEndian::write_u64(&mut qword, utils::hash(&options.entry_point));
    buf.extend_from_slice(&qword);
    LittleEndian::write_u32(&mut word, assembly.len() as u32);
    buf.extend_from_slice(&word);
    buf.extend_from_slice(assembly.as_bytes());
    buf
}
