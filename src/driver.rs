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

//! The compilation driver.
//!
//! Sequences the front end, the reflector and the pack/bundle codecs into
//! the two output modes, writes every artifact atomically and fails fast on
//! the first error. Platforms compile strictly in configuration order; a
//! later platform is never attempted once an earlier one failed.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::bundle::{self, Archive};
use crate::compiler::{Compile, CompiledShader, SourceOptions};
use crate::macros::impl_err_conversion;
use crate::options::{Config, Job};
use crate::pack::{self, StagePack};
use crate::reflect::{self, Reflector, ReflectorOptions};
use crate::shader::{Stage, Target};
use crate::utils;

/// Represents a driver error.
#[derive(Debug)]
pub enum Error {
    /// The input file could not be read.
    Input {
        /// The input path.
        path: PathBuf,

        /// The underlying io error.
        error: std::io::Error,
    },

    /// A compilation attempt failed.
    Compile {
        /// The target the attempt was for.
        target: Target,

        /// The compiler error.
        error: crate::compiler::error::Error,
    },

    /// A reflection error.
    Reflect(reflect::Error),

    /// A stage pack serialization error.
    Pack(pack::error::WriteError),

    /// A bundle archive serialization error.
    Archive(bundle::WriteError),

    /// The bundle specification is malformed.
    Spec(serde_json::Error),

    /// A bundle specification names an unknown stage.
    UnknownStage(String),

    /// The stage could not be inferred from a bundle member file.
    CannotInferStage(PathBuf),

    /// An artifact could not be written.
    Write {
        /// The destination path.
        path: PathBuf,

        /// The underlying io error.
        error: std::io::Error,
    },

    /// Describes an io error.
    Io(std::io::Error),
}

impl_err_conversion!(
    Error {
        reflect::Error => Reflect,
        pack::error::WriteError => Pack,
        bundle::WriteError => Archive,
        std::io::Error => Io
    }
);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Input { path, error } => {
                write!(f, "could not open input file {}: {}", path.display(), error)
            },
            Error::Compile { target, error } => {
                write!(f, "compilation failed for target {}: {}", target, error)
            },
            Error::Reflect(e) => write!(f, "reflection error: {}", e),
            Error::Pack(e) => write!(f, "stage pack error: {}", e),
            Error::Archive(e) => write!(f, "bundle archive error: {}", e),
            Error::Spec(e) => write!(f, "malformed bundle specification: {}", e),
            Error::UnknownStage(name) => write!(f, "unknown shader stage ({})", name),
            Error::CannotInferStage(path) => {
                write!(f, "cannot infer shader stage from {}", path.display())
            },
            Error::Write { path, error } => {
                write!(f, "could not write file to {}: {}", path.display(), error)
            },
            Error::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

/// Runs the driver against a validated configuration.
///
/// # Arguments
///
/// * `config`: the validated configuration.
/// * `backend`: the single-target front end.
///
/// returns: Result<(), Error>
///
/// # Errors
///
/// Returns an [Error](Error) describing the first failed stage; no further
/// stage is attempted after a failure.
pub fn run(config: &Config, backend: &dyn Compile) -> Result<(), Error> {
    match &config.job {
        Job::Bundle { spec } => generate_bundle(config, spec, backend),
        Job::Shader { input, stage } => run_shader(config, input, *stage, backend),
    }
}

fn run_shader(config: &Config, input: &Path, stage: Stage, backend: &dyn Compile) -> Result<(), Error> {
    let source = std::fs::read(input).map_err(|error| Error::Input {
        path: input.into(),
        error,
    })?;
    if config.runtime_stage {
        return output_runtime_stages(config, &source, input, stage, backend);
    }

    // Direct mode compiles exactly once. The outputs of this branch do not
    // depend on which requested platform produced them, so the first entry
    // of the platform list is used.
    let target = config.platforms[0];
    let options = source_options(config, stage, target);
    info!("Compiling {} for target {}...", input.display(), target);
    let shader = backend
        .compile(&source, input, &options)
        .map_err(|error| Error::Compile { target, error })?;
    if let Some(path) = &config.spirv {
        write_artifact(path, shader.assembly.as_bytes())?;
    }
    write_artifact(&config.sl, shader.native_source.as_bytes())?;
    output_reflection(config, &shader, input, target)?;
    output_depfile(config, input, &shader)?;
    Ok(())
}

/// Compiles one source for every configured platform, in configuration
/// order, aggregating one stage record per platform.
fn compile_stages(
    config: &Config,
    source: &[u8],
    input: &Path,
    stage: Stage,
    entry_point: &str,
    backend: &dyn Compile,
) -> Result<StagePack, Error> {
    let mut pack = StagePack::new();
    for target in config.platforms.iter().copied() {
        let options = SourceOptions {
            target,
            stage,
            entry_point: entry_point.into(),
            include_dirs: config.include_dirs.clone(),
        };
        let reflector_options = reflector_options(config, input, target, entry_point);
        info!("Compiling {} for target {}...", input.display(), target);
        let shader = backend
            .compile(source, input, &options)
            .map_err(|error| Error::Compile { target, error })?;
        let reflector = Reflector::new(&shader, reflector_options)?;
        debug!("Reflected {} binding(s) for target {}", reflector.bindings().len(), target);
        pack.add_stage(reflector.stage_data())?;
    }
    Ok(pack)
}

fn output_runtime_stages(
    config: &Config,
    source: &[u8],
    input: &Path,
    stage: Stage,
    backend: &dyn Compile,
) -> Result<(), Error> {
    let pack = compile_stages(config, source, input, stage, &config.entry_point, backend)?;
    let buf = match config.json_format {
        true => pack.to_json()?,
        false => pack.to_bytes()?,
    };
    info!("Writing {}...", config.sl.display());
    let path = write_artifact(&config.sl, &buf)?;
    // Tools that consume the stage pack expect the access mode to be 0644.
    utils::set_permissive_access(&path).map_err(|error| Error::Write { path, error })?;
    Ok(())
}

fn generate_bundle(config: &Config, spec: &str, backend: &dyn Compile) -> Result<(), Error> {
    let spec = bundle::parse_spec(spec).map_err(Error::Spec)?;
    let mut archive = Archive::new();
    for (name, shader_ref) in &spec {
        let stage = match &shader_ref.stage {
            Some(name) => Stage::from_name(name).ok_or_else(|| Error::UnknownStage(name.clone()))?,
            None => Stage::from_path(&shader_ref.file)
                .ok_or_else(|| Error::CannotInferStage(shader_ref.file.clone()))?,
        };
        let entry_point = shader_ref
            .entry_point
            .as_deref()
            .unwrap_or(&config.entry_point);
        let source = std::fs::read(&shader_ref.file).map_err(|error| Error::Input {
            path: shader_ref.file.clone(),
            error,
        })?;
        info!("Bundling {}...", name);
        let pack = compile_stages(config, &source, &shader_ref.file, stage, entry_point, backend)?;
        archive.add_entry(name.clone(), pack)?;
    }
    let buf = archive.to_bytes()?;
    info!("Writing {}...", config.sl.display());
    let path = write_artifact(&config.sl, &buf)?;
    utils::set_permissive_access(&path).map_err(|error| Error::Write { path, error })?;
    Ok(())
}

fn source_options(config: &Config, stage: Stage, target: Target) -> SourceOptions {
    SourceOptions {
        target,
        stage,
        entry_point: config.entry_point.clone(),
        include_dirs: config.include_dirs.clone(),
    }
}

fn reflector_options(config: &Config, input: &Path, target: Target, entry_point: &str) -> ReflectorOptions {
    let header_file_name = config
        .reflection_header
        .as_ref()
        .and_then(|v| v.file_name())
        .and_then(|v| v.to_str())
        .unwrap_or("")
        .into();
    ReflectorOptions {
        target,
        entry_point: entry_point.into(),
        shader_name: utils::infer_shader_name(input),
        header_file_name,
    }
}

fn output_reflection(
    config: &Config,
    shader: &CompiledShader,
    input: &Path,
    target: Target,
) -> Result<(), Error> {
    if config.reflection_json.is_none()
        && config.reflection_header.is_none()
        && config.reflection_cc.is_none()
    {
        return Ok(());
    }
    let options = reflector_options(config, input, target, &config.entry_point);
    let reflector = Reflector::new(shader, options)?;
    if let Some(path) = &config.reflection_json {
        write_artifact(path, &reflector.reflection_json()?)?;
    }
    if let Some(path) = &config.reflection_header {
        write_artifact(path, reflector.reflection_decls().as_bytes())?;
    }
    if let Some(path) = &config.reflection_cc {
        write_artifact(path, reflector.reflection_table().as_bytes())?;
    }
    Ok(())
}

fn output_depfile(config: &Config, input: &Path, shader: &CompiledShader) -> Result<(), Error> {
    let depfile = match &config.depfile {
        Some(v) => v,
        None => return Ok(()),
    };
    let mut inputs = Vec::with_capacity(shader.includes.len() + 1);
    inputs.push(input.to_path_buf());
    inputs.extend(shader.includes.iter().cloned());
    let contents = render_depfile(&config.sl, &inputs);
    write_artifact(depfile, contents.as_bytes())?;
    Ok(())
}

/// Renders a Make-style dependency rule mapping the produced result path to
/// its transitive inputs.
fn render_depfile(output: &Path, inputs: &[PathBuf]) -> String {
    let mut out = String::new();
    out.push_str(&escape_dep_path(output));
    out.push(':');
    for input in inputs {
        out.push(' ');
        out.push_str(&escape_dep_path(input));
    }
    out.push('\n');
    out
}

fn escape_dep_path(path: &Path) -> String {
    path.to_string_lossy().replace(' ', "\\ ")
}

/// Resolves `path` to absolute form and writes `data` there atomically.
fn write_artifact(path: &Path, data: &[u8]) -> Result<PathBuf, Error> {
    let path = utils::absolutize(path)?;
    utils::write_atomically(&path, data).map_err(|error| Error::Write {
        path: path.clone(),
        error,
    })?;
    Ok(path)
}
