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

//! Static reflection of a compiled shader's resource interface.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::compiler::CompiledShader;
use crate::macros::impl_err_conversion;
use crate::pack::StageData;
use crate::shader::{Binding, BindingType, Stage, Target};

/// Represents a reflection error.
#[derive(Debug)]
pub enum Error {
    /// Describes a JSON encoding error.
    Json(serde_json::Error),

    /// A malformed resource declaration.
    MalformedDeclaration(String),

    /// A register number outside the encodable range.
    RegisterRange(u64),

    /// Two resources of one type class share a register.
    DuplicateRegister {
        /// The binding type class.
        ty: BindingType,

        /// The register number.
        register: u8,
    },
}

impl_err_conversion!(Error { serde_json::Error => Json });

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::MalformedDeclaration(line) => {
                write!(f, "malformed resource declaration: {}", line)
            },
            Error::RegisterRange(v) => write!(f, "register number out of range ({})", v),
            Error::DuplicateRegister { ty, register } => {
                write!(f, "duplicate {} register ({})", ty.name(), register)
            },
        }
    }
}

impl std::error::Error for Error {}

/// Per-reflection parameters.
///
/// *Built once per compilation attempt; read-only input to the reflector.*
#[derive(Clone, Debug)]
pub struct ReflectorOptions {
    /// The target rendering API of the compiled shader.
    pub target: Target,

    /// The entry point name.
    pub entry_point: String,

    /// The logical shader name, inferred from the source path.
    pub shader_name: String,

    /// The file name of the reflection declarations artifact, referenced by
    /// the generated table artifact.
    pub header_file_name: String,
}

#[derive(Serialize)]
struct ReflectionDoc<'a> {
    shader: &'a str,
    entry_point: &'a str,
    target: Target,
    stage: Stage,
    bindings: &'a [Binding],
}

/// Reflects the resource interface of one compiled shader.
pub struct Reflector {
    options: ReflectorOptions,
    stage: Stage,
    bindings: Vec<Binding>,
    byte_code: Vec<u8>,
}

impl Reflector {
    /// Builds a reflector from a successfully compiled shader.
    ///
    /// # Arguments
    ///
    /// * `shader`: the compiled shader to inspect.
    /// * `options`: the reflection parameters.
    ///
    /// returns: Result<Reflector, Error>
    ///
    /// # Errors
    ///
    /// Returns an [Error](crate::reflect::Error) if a resource declaration
    /// is malformed or assigns conflicting registers.
    pub fn new(shader: &CompiledShader, options: ReflectorOptions) -> Result<Reflector, Error> {
        let bindings = scan_bindings(&shader.assembly)?;
        Ok(Reflector {
            options,
            stage: shader.stage,
            bindings,
            byte_code: shader.byte_code.clone(),
        })
    }

    /// Returns the reflected bindings, in declaration order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Encodes the reflection JSON document.
    ///
    /// # Errors
    ///
    /// Returns an [Error](crate::reflect::Error) if the document could not
    /// be encoded.
    pub fn reflection_json(&self) -> Result<Vec<u8>, Error> {
        let doc = ReflectionDoc {
            shader: &self.options.shader_name,
            entry_point: &self.options.entry_point,
            target: self.options.target,
            stage: self.stage,
            bindings: &self.bindings,
        };
        let mut buf = serde_json::to_vec_pretty(&doc)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Generates the reflection declarations artifact: a Rust module of
    /// binding-register constants.
    pub fn reflection_decls(&self) -> String {
        let mut out = String::new();
        out.push_str("// Generated by stagec. Do not edit.\n\n");
        out.push_str(&format!(
            "pub const SHADER_NAME: &str = {:?};\n",
            self.options.shader_name
        ));
        out.push_str(&format!(
            "pub const ENTRY_POINT: &str = {:?};\n",
            self.options.entry_point
        ));
        out.push_str(&format!("pub const STAGE: &str = {:?};\n", self.stage.name()));
        for binding in &self.bindings {
            out.push('\n');
            out.push_str(&format!(
                "/// Register of `{}` ({}).\n",
                binding.name,
                binding.ty.name()
            ));
            out.push_str(&format!(
                "pub const {}_REGISTER: u8 = {};\n",
                const_ident(&binding.name),
                binding.register
            ));
        }
        out
    }

    /// Generates the reflection table artifact: a Rust module holding the
    /// full binding table.
    pub fn reflection_table(&self) -> String {
        let mut out = String::new();
        out.push_str("// Generated by stagec. Do not edit.\n");
        if !self.options.header_file_name.is_empty() {
            out.push_str(&format!(
                "// Companion declarations: {}\n",
                self.options.header_file_name
            ));
        }
        out.push('\n');
        out.push_str("/// (name, binding type, register) of every reflected resource.\n");
        out.push_str("pub static BINDINGS: &[(&str, &str, u8)] = &[\n");
        for binding in &self.bindings {
            out.push_str(&format!(
                "    ({:?}, {:?}, {}),\n",
                binding.name,
                binding.ty.name(),
                binding.register
            ));
        }
        out.push_str("];\n");
        out
    }

    /// Produces the normalized per-target stage record for packing.
    pub fn stage_data(&self) -> StageData {
        StageData {
            shader_name: self.options.shader_name.clone(),
            target: self.options.target,
            entry_point: self.options.entry_point.clone(),
            stage: self.stage,
            bindings: self.bindings.clone(),
            byte_code: self.byte_code.clone(),
        }
    }
}

fn const_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push('_');
        }
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

struct LayoutArgs {
    register: Option<u64>,
    push_constant: bool,
}

fn parse_layout_args(args: &str) -> Result<LayoutArgs, Error> {
    let mut parsed = LayoutArgs {
        register: None,
        push_constant: false,
    };
    for arg in args.split(',') {
        let arg = arg.trim();
        if arg == "push_constant" {
            parsed.push_constant = true;
        } else if let Some(rest) = arg.strip_prefix("binding") {
            let value = rest
                .trim_start()
                .strip_prefix('=')
                .map(str::trim)
                .and_then(|v| v.parse::<u64>().ok())
                .ok_or_else(|| Error::MalformedDeclaration(arg.into()))?;
            parsed.register = Some(value);
        }
        // Other qualifiers (set, std140, location, ...) do not affect the
        // reflected interface.
    }
    Ok(parsed)
}

fn classify(token: &str, rest: &str, args: &LayoutArgs) -> Option<(BindingType, String)> {
    if token == "sampler" {
        let name = rest.split_whitespace().next()?;
        return Some((BindingType::Sampler, trim_ident(name)));
    }
    if token.starts_with("sampler") || token.starts_with("texture") || token.starts_with("image") {
        let name = rest.split_whitespace().next()?;
        return Some((BindingType::Texture, trim_ident(name)));
    }
    let ty = match args.push_constant {
        true => BindingType::Constant,
        false => BindingType::ConstantBuffer,
    };
    Some((ty, trim_ident(token)))
}

fn trim_ident(token: &str) -> String {
    token.trim_end_matches([';', '{']).trim().into()
}

/// Scans the normalized program text for resource declarations.
///
/// Recognized forms are GLSL-style `layout(...) uniform ...` declarations:
/// combined or separate image samplers map to texture/sampler bindings,
/// uniform blocks to constant buffers, and `push_constant` blocks to
/// constants.
pub fn scan_bindings(text: &str) -> Result<Vec<Binding>, Error> {
    let mut bindings: Vec<Binding> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        let rest = match trimmed.strip_prefix("layout") {
            Some(v) => v.trim_start(),
            None => continue,
        };
        let rest = match rest.strip_prefix('(') {
            Some(v) => v,
            None => continue,
        };
        let close = match rest.find(')') {
            Some(v) => v,
            None => return Err(Error::MalformedDeclaration(trimmed.into())),
        };
        let args = parse_layout_args(&rest[..close])?;
        let decl = rest[close + 1..].trim_start();
        let decl = match decl.strip_prefix("uniform") {
            Some(v) => v.trim_start(),
            // `layout(location = N) in/out ...` and friends.
            None => continue,
        };
        let mut tokens = decl.split_whitespace();
        let token = match tokens.next() {
            Some(v) => v,
            None => return Err(Error::MalformedDeclaration(trimmed.into())),
        };
        let (ty, name) = match classify(token, decl[token.len()..].trim_start(), &args) {
            Some(v) => v,
            None => return Err(Error::MalformedDeclaration(trimmed.into())),
        };
        if name.is_empty() {
            return Err(Error::MalformedDeclaration(trimmed.into()));
        }
        let register = match args.register {
            Some(v) => {
                if v > u8::MAX as u64 {
                    return Err(Error::RegisterRange(v));
                }
                v as u8
            },
            None => match ty {
                // Push constant blocks have no binding qualifier.
                BindingType::Constant => 0,
                _ => return Err(Error::MalformedDeclaration(trimmed.into())),
            },
        };
        if bindings.iter().any(|v| v.ty == ty && v.register == register) {
            return Err(Error::DuplicateRegister { ty, register });
        }
        bindings.push(Binding { name, ty, register });
    }
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_every_declaration_form() {
        let text = "\
layout(binding = 0) uniform sampler2D albedo;
layout(binding = 1) uniform sampler shadowSampler;
layout(set = 0, binding = 2) uniform texture2D shadowMap;
layout(std140, binding = 0) uniform Transforms {
    mat4 world_view_projection;
} transforms;
layout(push_constant) uniform Tint { vec4 color; } tint;
layout(location = 0) in vec3 position;
void main() {}
";
        let bindings = scan_bindings(text).unwrap();
        assert_eq!(bindings.len(), 5);
        assert_eq!(bindings[0].name, "albedo");
        assert_eq!(bindings[0].ty, BindingType::Texture);
        assert_eq!(bindings[0].register, 0);
        assert_eq!(bindings[1].ty, BindingType::Sampler);
        assert_eq!(bindings[2].name, "shadowMap");
        assert_eq!(bindings[2].ty, BindingType::Texture);
        assert_eq!(bindings[3].name, "Transforms");
        assert_eq!(bindings[3].ty, BindingType::ConstantBuffer);
        assert_eq!(bindings[4].name, "Tint");
        assert_eq!(bindings[4].ty, BindingType::Constant);
    }

    #[test]
    fn duplicate_register_in_one_class_is_an_error() {
        let text = "\
layout(binding = 0) uniform sampler2D a;
layout(binding = 0) uniform sampler2D b;
";
        let err = scan_bindings(text).unwrap_err();
        assert!(matches!(err, Error::DuplicateRegister { .. }));
    }

    #[test]
    fn register_spaces_are_per_type_class() {
        let text = "\
layout(binding = 0) uniform sampler2D a;
layout(binding = 0) uniform Camera { mat4 view; } camera;
";
        let bindings = scan_bindings(text).unwrap();
        assert_eq!(bindings.len(), 2);
    }

    #[test]
    fn block_without_binding_is_an_error() {
        let text = "layout(std140) uniform Camera { mat4 view; } camera;\n";
        let err = scan_bindings(text).unwrap_err();
        assert!(matches!(err, Error::MalformedDeclaration(_)));
    }

    #[test]
    fn register_range_is_checked() {
        let text = "layout(binding = 300) uniform sampler2D a;\n";
        let err = scan_bindings(text).unwrap_err();
        assert!(matches!(err, Error::RegisterRange(300)));
    }

    #[test]
    fn const_idents_are_sanitized() {
        assert_eq!(const_ident("albedo"), "ALBEDO");
        assert_eq!(const_ident("shadow-map.0"), "SHADOW_MAP_0");
        assert_eq!(const_ident("0weird"), "_0WEIRD");
    }
}
