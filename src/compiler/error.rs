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

//! Compiler error definitions.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::macros::impl_err_conversion;
use crate::shader::Target;

/// Represents a shader compile error.
#[derive(Debug)]
pub enum Error {
    /// Describes an io error.
    Io(std::io::Error),

    /// The source is not valid UTF-8.
    Utf8(std::str::Utf8Error),

    /// An include directive could not be resolved.
    IncludeNotFound {
        /// The include name as written in the directive.
        name: String,

        /// The file containing the directive.
        from: PathBuf,
    },

    /// The include chain exceeds the maximum supported depth.
    IncludeDepth(usize),

    /// A malformed preprocessor directive.
    MalformedDirective(String),

    /// The source does not define the configured entry point.
    MissingEntryPoint(String),

    /// The source restricts its targets and does not list the requested one.
    UnsupportedTarget(Target),
}

impl_err_conversion!(
    Error {
        std::io::Error => Io,
        std::str::Utf8Error => Utf8
    }
);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Utf8(e) => write!(f, "source is not valid UTF-8: {}", e),
            Error::IncludeNotFound { name, from } => {
                write!(f, "could not resolve include \"{}\" from {}", name, from.display())
            },
            Error::IncludeDepth(depth) => {
                write!(f, "include chain exceeds maximum depth ({})", depth)
            },
            Error::MalformedDirective(line) => write!(f, "malformed directive: {}", line),
            Error::MissingEntryPoint(name) => {
                write!(f, "entry point '{}' is not defined by the source", name)
            },
            Error::UnsupportedTarget(target) => {
                write!(f, "source does not support target {}", target)
            },
        }
    }
}

impl std::error::Error for Error {}
