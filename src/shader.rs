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

//! Core shader domain types shared by the compiler, the reflector and the
//! stage pack codecs.

use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Enum of all target rendering APIs supported by the compiler.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// OpenGL 4.0 (Core context)
    Gl40,

    /// OpenGL 4.1 (Core context)
    Gl41,

    /// OpenGL ES 3.0
    Es30,

    /// OpenGL ES 3.1
    Es31,

    /// Vulkan 1.0
    Vk10,

    /// Vulkan 1.1
    Vk11,

    /// Vulkan 1.2
    Vk12,

    /// Apple Metal
    Mt,

    /// DirectX 11
    Dx11,

    /// DirectX 12
    Dx12,
}

/// All supported targets, in declaration order.
pub const TARGETS: [Target; 10] = [
    Target::Gl40,
    Target::Gl41,
    Target::Es30,
    Target::Es31,
    Target::Vk10,
    Target::Vk11,
    Target::Vk12,
    Target::Mt,
    Target::Dx11,
    Target::Dx12,
];

impl Target {
    /// Returns the stable one-byte wire code of this target.
    pub fn code(self) -> u8 {
        match self {
            Target::Gl40 => 0x1,
            Target::Gl41 => 0x2,
            Target::Es30 => 0x3,
            Target::Es31 => 0x4,
            Target::Vk10 => 0x5,
            Target::Vk11 => 0x6,
            Target::Vk12 => 0x7,
            Target::Mt => 0x8,
            Target::Dx11 => 0x9,
            Target::Dx12 => 0xA,
        }
    }

    /// Decodes a target from its wire code.
    pub fn from_code(code: u8) -> Option<Target> {
        match code {
            0x1 => Some(Target::Gl40),
            0x2 => Some(Target::Gl41),
            0x3 => Some(Target::Es30),
            0x4 => Some(Target::Es31),
            0x5 => Some(Target::Vk10),
            0x6 => Some(Target::Vk11),
            0x7 => Some(Target::Vk12),
            0x8 => Some(Target::Mt),
            0x9 => Some(Target::Dx11),
            0xA => Some(Target::Dx12),
            _ => None,
        }
    }

    /// Returns the stable lowercase name of this target, as used on the
    /// command line and in the JSON encodings.
    pub fn name(self) -> &'static str {
        match self {
            Target::Gl40 => "gl40",
            Target::Gl41 => "gl41",
            Target::Es30 => "es30",
            Target::Es31 => "es31",
            Target::Vk10 => "vk10",
            Target::Vk11 => "vk11",
            Target::Vk12 => "vk12",
            Target::Mt => "mt",
            Target::Dx11 => "dx11",
            Target::Dx12 => "dx12",
        }
    }

    /// Parses a target from its lowercase name.
    pub fn from_name(name: &str) -> Option<Target> {
        TARGETS.iter().copied().find(|v| v.name() == name)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Enum of all shader stages supported by the compiler.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Vertex shader stage.
    Vertex,

    /// Hull/Tessellation Control Shader (TCS) stage.
    Hull,

    /// Domain/Tessellation Evaluation Shader (TES) stage.
    Domain,

    /// Geometry shader stage.
    Geometry,

    /// Pixel/fragment shader stage.
    Pixel,
}

impl Stage {
    /// Returns the stable one-byte wire code of this stage.
    pub fn code(self) -> u8 {
        match self {
            Stage::Vertex => 0x0,
            Stage::Hull => 0x1,
            Stage::Domain => 0x2,
            Stage::Geometry => 0x3,
            Stage::Pixel => 0x4,
        }
    }

    /// Decodes a stage from its wire code.
    pub fn from_code(code: u8) -> Option<Stage> {
        match code {
            0x0 => Some(Stage::Vertex),
            0x1 => Some(Stage::Hull),
            0x2 => Some(Stage::Domain),
            0x3 => Some(Stage::Geometry),
            0x4 => Some(Stage::Pixel),
            _ => None,
        }
    }

    /// Returns the stable lowercase name of this stage.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Hull => "hull",
            Stage::Domain => "domain",
            Stage::Geometry => "geometry",
            Stage::Pixel => "pixel",
        }
    }

    /// Parses a stage from its lowercase name.
    pub fn from_name(name: &str) -> Option<Stage> {
        match name {
            "vertex" => Some(Stage::Vertex),
            "hull" => Some(Stage::Hull),
            "domain" => Some(Stage::Domain),
            "geometry" => Some(Stage::Geometry),
            "pixel" => Some(Stage::Pixel),
            _ => None,
        }
    }

    /// Infers the stage from a source file extension.
    ///
    /// Wrapper extensions (ex: `.glsl`) are skipped, so `blur.frag.glsl`
    /// infers the pixel stage.
    ///
    /// # Arguments
    ///
    /// * `path`: the shader source file path.
    ///
    /// returns: Option<Stage>
    pub fn from_path(path: &Path) -> Option<Stage> {
        let mut path = path;
        let mut stem = Path::new(path.file_name()?);
        loop {
            let ext = stem.extension()?.to_str()?;
            match ext {
                "vert" | "vs" => return Some(Stage::Vertex),
                "tesc" | "hs" => return Some(Stage::Hull),
                "tese" | "ds" => return Some(Stage::Domain),
                "geom" | "gs" => return Some(Stage::Geometry),
                "frag" | "pix" | "ps" => return Some(Stage::Pixel),
                _ => {
                    path = stem;
                    stem = Path::new(path.file_stem()?);
                }
            }
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of a reflected resource binding.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingType {
    /// A texture binding (includes combined image samplers).
    Texture,

    /// A standalone sampler binding.
    Sampler,

    /// A constant buffer binding.
    ConstantBuffer,

    /// A high performance constant binding (represented as push constants in vulkan).
    Constant,
}

impl BindingType {
    /// Returns the stable one-byte wire code of this binding type.
    pub fn code(self) -> u8 {
        match self {
            BindingType::Texture => 0x0,
            BindingType::Sampler => 0x1,
            BindingType::ConstantBuffer => 0x2,
            BindingType::Constant => 0x3,
        }
    }

    /// Decodes a binding type from its wire code.
    pub fn from_code(code: u8) -> Option<BindingType> {
        match code {
            0x0 => Some(BindingType::Texture),
            0x1 => Some(BindingType::Sampler),
            0x2 => Some(BindingType::ConstantBuffer),
            0x3 => Some(BindingType::Constant),
            _ => None,
        }
    }

    /// Returns the stable snake_case name of this binding type.
    pub fn name(self) -> &'static str {
        match self {
            BindingType::Texture => "texture",
            BindingType::Sampler => "sampler",
            BindingType::ConstantBuffer => "constant_buffer",
            BindingType::Constant => "constant",
        }
    }
}

/// Represents a reflected resource binding of a compiled shader.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Binding {
    /// The name of the binding.
    pub name: String,

    /// The type of the binding.
    pub ty: BindingType,

    /// The register number of the binding.
    pub register: u8,
}
