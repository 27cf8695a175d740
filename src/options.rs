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

//! Command line surface and resolved configuration.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use clap::Parser;

use crate::shader::{Stage, Target};

/// Compiles a shader for one or more target platforms and packs runtime stages.
#[derive(Parser, Debug)]
#[command(name = "stagec", version)]
pub struct Args {
    /// Path to the shader source file.
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output path for the native source artifact, or for the serialized
    /// stage pack / bundle archive in runtime-stage and bundle modes.
    #[arg(long, value_name = "PATH")]
    pub sl: Option<PathBuf>,

    /// Output path for the intermediate assembly artifact.
    #[arg(long, value_name = "PATH")]
    pub spirv: Option<PathBuf>,

    /// Output path for the reflection JSON document.
    #[arg(long, value_name = "PATH")]
    pub reflection_json: Option<PathBuf>,

    /// Output path for the generated reflection declarations module.
    #[arg(long, value_name = "PATH")]
    pub reflection_header: Option<PathBuf>,

    /// Output path for the generated reflection table module.
    #[arg(long, value_name = "PATH")]
    pub reflection_cc: Option<PathBuf>,

    /// Output path for the build-dependency file.
    #[arg(long, value_name = "PATH")]
    pub depfile: Option<PathBuf>,

    /// Target platform to compile for; repeat to compile for several
    /// (order preserved).
    #[arg(long = "platform", value_name = "NAME")]
    pub platforms: Vec<String>,

    /// Serialize all compiled platform variants into a single runtime stage
    /// pack instead of emitting direct artifacts.
    #[arg(long)]
    pub runtime_stage: bool,

    /// Encode the runtime stage pack as JSON instead of the binary container.
    #[arg(long)]
    pub json: bool,

    /// Shader bundle specification (JSON document); switches to bundle
    /// generation.
    #[arg(long, value_name = "SPEC")]
    pub shader_bundle: Option<String>,

    /// Entry point name.
    #[arg(long, value_name = "NAME", default_value = "main")]
    pub entry_point: String,

    /// Override the shader stage inferred from the input file extension.
    #[arg(long, value_name = "NAME")]
    pub stage: Option<String>,

    /// Additional include search directory; repeatable.
    #[arg(long = "include", short = 'I', value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,
}

/// Represents a configuration validation error.
#[derive(Debug)]
pub enum Error {
    /// No input file and no bundle specification.
    MissingInput,

    /// No output path.
    MissingOutput,

    /// Both an input file and a bundle specification.
    InputWithBundle,

    /// Both runtime-stage mode and a bundle specification.
    RuntimeStageWithBundle,

    /// A stage override together with a bundle specification.
    StageWithBundle,

    /// JSON pack format outside runtime-stage mode.
    JsonWithoutRuntimeStage,

    /// No target platform.
    NoPlatforms,

    /// An unknown target platform name.
    UnknownPlatform(String),

    /// A target platform listed twice.
    DuplicatePlatform(Target),

    /// An unknown stage name.
    UnknownStage(String),

    /// The stage could not be inferred from the input file extension.
    CannotInferStage(PathBuf),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingInput => f.write_str("no input file specified"),
            Error::MissingOutput => f.write_str("no output path specified (--sl)"),
            Error::InputWithBundle => {
                f.write_str("--input and --shader-bundle are mutually exclusive")
            },
            Error::RuntimeStageWithBundle => {
                f.write_str("--runtime-stage and --shader-bundle are mutually exclusive")
            },
            Error::StageWithBundle => {
                f.write_str("--stage and --shader-bundle are mutually exclusive")
            },
            Error::JsonWithoutRuntimeStage => {
                f.write_str("--json requires --runtime-stage")
            },
            Error::NoPlatforms => f.write_str("no target platform specified (--platform)"),
            Error::UnknownPlatform(name) => write!(f, "unknown target platform ({})", name),
            Error::DuplicatePlatform(target) => {
                write!(f, "target platform listed twice ({})", target)
            },
            Error::UnknownStage(name) => write!(f, "unknown shader stage ({})", name),
            Error::CannotInferStage(path) => {
                write!(f, "cannot infer shader stage from {}", path.display())
            },
        }
    }
}

impl std::error::Error for Error {}

/// The job selected by the configuration.
#[derive(Clone, Debug)]
pub enum Job {
    /// Compile one shader source file.
    Shader {
        /// The shader source file.
        input: PathBuf,

        /// The resolved shader stage.
        stage: Stage,
    },

    /// Generate a bundle archive from a specification document.
    Bundle {
        /// The JSON specification text.
        spec: String,
    },
}

/// The validated, immutable configuration consumed by the driver.
#[derive(Clone, Debug)]
pub struct Config {
    /// The job to run.
    pub job: Job,

    /// The primary output path (native source, stage pack or archive).
    pub sl: PathBuf,

    /// The intermediate assembly output path.
    pub spirv: Option<PathBuf>,

    /// The reflection JSON output path.
    pub reflection_json: Option<PathBuf>,

    /// The reflection declarations output path.
    pub reflection_header: Option<PathBuf>,

    /// The reflection table output path.
    pub reflection_cc: Option<PathBuf>,

    /// The build-dependency output path.
    pub depfile: Option<PathBuf>,

    /// The target platforms, in command line order.
    pub platforms: Vec<Target>,

    /// Whether to serialize a runtime stage pack instead of direct artifacts.
    pub runtime_stage: bool,

    /// Whether the stage pack uses the JSON encoding.
    pub json_format: bool,

    /// The entry point name.
    pub entry_point: String,

    /// Additional include search directories.
    pub include_dirs: Vec<PathBuf>,
}

impl Args {
    /// Validates the parsed command line into a [Config](Config).
    ///
    /// Contradictory or incomplete flag combinations are rejected here,
    /// before any compilation or filesystem side effect.
    ///
    /// # Errors
    ///
    /// Returns an [Error](Error) describing the first rejected combination.
    pub fn validate(self) -> Result<Config, Error> {
        let job = match (self.shader_bundle, self.input) {
            (Some(_), Some(_)) => return Err(Error::InputWithBundle),
            (None, None) => return Err(Error::MissingInput),
            (Some(spec), None) => {
                if self.runtime_stage {
                    return Err(Error::RuntimeStageWithBundle);
                }
                if self.stage.is_some() {
                    return Err(Error::StageWithBundle);
                }
                if self.json {
                    return Err(Error::JsonWithoutRuntimeStage);
                }
                Job::Bundle { spec }
            },
            (None, Some(input)) => {
                if self.json && !self.runtime_stage {
                    return Err(Error::JsonWithoutRuntimeStage);
                }
                let stage = match &self.stage {
                    Some(name) => {
                        Stage::from_name(name).ok_or_else(|| Error::UnknownStage(name.clone()))?
                    },
                    None => {
                        Stage::from_path(&input).ok_or_else(|| Error::CannotInferStage(input.clone()))?
                    },
                };
                Job::Shader { input, stage }
            },
        };
        let sl = self.sl.ok_or(Error::MissingOutput)?;
        if self.platforms.is_empty() {
            return Err(Error::NoPlatforms);
        }
        let mut platforms = Vec::with_capacity(self.platforms.len());
        for name in &self.platforms {
            let target = Target::from_name(name).ok_or_else(|| Error::UnknownPlatform(name.clone()))?;
            if platforms.contains(&target) {
                return Err(Error::DuplicatePlatform(target));
            }
            platforms.push(target);
        }
        Ok(Config {
            job,
            sl,
            spirv: self.spirv,
            reflection_json: self.reflection_json,
            reflection_header: self.reflection_header,
            reflection_cc: self.reflection_cc,
            depfile: self.depfile,
            platforms,
            runtime_stage: self.runtime_stage,
            json_format: self.json,
            entry_point: self.entry_point,
            include_dirs: self.include_dirs,
        })
    }
}
