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

//! Stage pack error definitions.

use std::fmt::{Display, Formatter};

use crate::macros::{impl_err_conversion, named_enum};
use crate::shader::Target;

named_enum!(
    /// Represents the context of an invalid code.
    InvalidCodeContext {
        /// Invalid render API target code.
        Target: "target",

        /// Invalid shader stage code.
        Stage: "stage",

        /// Invalid binding type code.
        BindingType: "binding type"
    }
);

named_enum!(
    /// Represents the context of an EOS error.
    #[derive(Copy, Clone)]
    EosContext {
        /// Reached EOS while reading the pack header.
        Header: "header",

        /// Reached EOS while reading a stage record.
        Record: "stage record",

        /// Reached EOS while reading a binding table.
        Binding: "binding table",

        /// Reached EOS while reading byte code.
        ByteCode: "byte code"
    }
);

/// Represents a stage pack read error.
#[derive(Debug)]
pub enum ReadError {
    /// Describes an io error.
    Io(std::io::Error),

    /// Unknown pack signature.
    BadSignature([u8; 3]),

    /// Unsupported pack version.
    BadVersion(u32),

    /// Invalid code.
    ///
    /// # Arguments
    /// * the context.
    /// * the coding byte.
    InvalidCode(InvalidCodeContext, u8),

    /// Describes an EOS (End Of Section) error while reading.
    Eos(EosContext),

    /// A string field is not valid UTF-8.
    Utf8(std::string::FromUtf8Error),

    /// The pack contains more than one stage for the same target.
    DuplicateTarget(Target),

    /// Describes a JSON decoding error.
    Json(serde_json::Error),
}

impl_err_conversion!(
    ReadError {
        std::io::Error => Io,
        std::string::FromUtf8Error => Utf8,
        serde_json::Error => Json
    }
);

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "io error: {}", e),
            ReadError::BadSignature(sig) => {
                write!(f, "unknown pack signature ({}{}{})", sig[0], sig[1], sig[2])
            },
            ReadError::BadVersion(v) => write!(f, "unsupported pack version ({})", v),
            ReadError::InvalidCode(ctx, code) => {
                write!(f, "invalid {} code ({})", ctx.name(), code)
            },
            ReadError::Eos(ctx) => write!(f, "got EOS while reading {}", ctx.name()),
            ReadError::Utf8(e) => write!(f, "utf8 error: {}", e),
            ReadError::DuplicateTarget(target) => {
                write!(f, "duplicate stage for target {}", target)
            },
            ReadError::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

/// Represents a stage pack write error.
#[derive(Debug)]
pub enum WriteError {
    /// Describes an io error.
    Io(std::io::Error),

    /// The pack contains no stages.
    Empty,

    /// Describes a field that is too large to be encoded.
    Capacity(usize),

    /// A stage for this target is already present.
    DuplicateTarget(Target),

    /// Describes a JSON encoding error.
    Json(serde_json::Error),
}

impl_err_conversion!(
    WriteError {
        std::io::Error => Io,
        serde_json::Error => Json
    }
);

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::Io(e) => write!(f, "io error: {}", e),
            WriteError::Empty => f.write_str("refusing to serialize an empty stage pack"),
            WriteError::Capacity(size) => {
                write!(f, "maximum field size exceeded ({})", size)
            },
            WriteError::DuplicateTarget(target) => {
                write!(f, "a stage for target {} is already present", target)
            },
            WriteError::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for WriteError {}
