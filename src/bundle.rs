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

//! The shader bundle archive and its build specification.
//!
//! A bundle archive holds one [StagePack](crate::pack::StagePack) per named
//! shader. The build specification is a JSON document mapping each shader
//! name to a source reference.

use std::collections::BTreeMap;
use std::collections::btree_map::Iter;
use std::fmt::{Display, Formatter};
use std::io::{Read, Write};
use std::path::PathBuf;

use byteorder::{ByteOrder, LittleEndian};
use serde::Deserialize;

use crate::macros::impl_err_conversion;
use crate::pack::{self, StagePack};

/// The standard signature of a bundle archive.
pub const SIGNATURE: [u8; 3] = *b"RSB";

/// The supported bundle archive version for this decoder/encoder.
pub const SUPPORTED_VERSION: u32 = 0x1;

/// A reference to one shader source inside a bundle specification.
#[derive(Clone, Debug, Deserialize)]
pub struct ShaderRef {
    /// The shader source file.
    pub file: PathBuf,

    /// The stage name; inferred from the file extension when absent.
    #[serde(default)]
    pub stage: Option<String>,

    /// The entry point name; the configured default applies when absent.
    #[serde(default)]
    pub entry_point: Option<String>,
}

/// Parses a bundle specification document.
///
/// # Arguments
///
/// * `spec`: the JSON specification text.
///
/// returns: Result<BTreeMap<String, ShaderRef>, serde_json::Error>
///
/// # Errors
///
/// Returns a [serde_json::Error] if the document is malformed.
pub fn parse_spec(spec: &str) -> Result<BTreeMap<String, ShaderRef>, serde_json::Error> {
    serde_json::from_str(spec)
}

/// Represents a bundle archive read error.
#[derive(Debug)]
pub enum ReadError {
    /// Describes an io error.
    Io(std::io::Error),

    /// Unknown archive signature.
    BadSignature([u8; 3]),

    /// Unsupported archive version.
    BadVersion(u32),

    /// The archive is truncated.
    Eos,

    /// A name field is not valid UTF-8.
    Utf8(std::string::FromUtf8Error),

    /// The archive holds two entries with one name.
    DuplicateName(String),

    /// An embedded stage pack error.
    Pack(pack::error::ReadError),
}

impl_err_conversion!(
    ReadError {
        std::io::Error => Io,
        std::string::FromUtf8Error => Utf8,
        pack::error::ReadError => Pack
    }
);

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "io error: {}", e),
            ReadError::BadSignature(sig) => {
                write!(f, "unknown archive signature ({}{}{})", sig[0], sig[1], sig[2])
            },
            ReadError::BadVersion(v) => write!(f, "unsupported archive version ({})", v),
            ReadError::Eos => f.write_str("got EOS while reading the archive"),
            ReadError::Utf8(e) => write!(f, "utf8 error: {}", e),
            ReadError::DuplicateName(name) => write!(f, "duplicate archive entry ({})", name),
            ReadError::Pack(e) => write!(f, "stage pack error: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

/// Represents a bundle archive write error.
#[derive(Debug)]
pub enum WriteError {
    /// Describes an io error.
    Io(std::io::Error),

    /// The archive contains no entries.
    Empty,

    /// Describes a field that is too large to be encoded.
    Capacity(usize),

    /// An entry with this name is already present.
    DuplicateName(String),

    /// An embedded stage pack error.
    Pack(pack::error::WriteError),
}

impl_err_conversion!(
    WriteError {
        std::io::Error => Io,
        pack::error::WriteError => Pack
    }
);

impl Display for WriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteError::Io(e) => write!(f, "io error: {}", e),
            WriteError::Empty => f.write_str("refusing to serialize an empty archive"),
            WriteError::Capacity(size) => write!(f, "maximum field size exceeded ({})", size),
            WriteError::DuplicateName(name) => {
                write!(f, "an archive entry named {} is already present", name)
            },
            WriteError::Pack(e) => write!(f, "stage pack error: {}", e),
        }
    }
}

impl std::error::Error for WriteError {}

/// A bundle archive: one stage pack per named shader.
#[derive(Default, Debug)]
pub struct Archive {
    entries: BTreeMap<String, StagePack>,
}

impl Archive {
    pub fn new() -> Archive {
        Archive {
            entries: BTreeMap::new(),
        }
    }

    /// Adds a named stage pack into this archive.
    ///
    /// # Errors
    ///
    /// A [WriteError](WriteError) is returned if an entry with the same name
    /// is already present.
    pub fn add_entry<S: Into<String>>(&mut self, name: S, pack: StagePack) -> Result<(), WriteError> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(WriteError::DuplicateName(name));
        }
        self.entries.insert(name, pack);
        Ok(())
    }

    /// Returns the number of entries contained in this archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the stage pack stored under the given name, if any.
    pub fn get(&self, name: &str) -> Option<&StagePack> {
        self.entries.get(name)
    }

    /// Iterates over all entries, ordered by name.
    pub fn entries(&self) -> Iter<'_, String, StagePack> {
        self.entries.iter()
    }

    /// Writes the binary encoding of this archive.
    ///
    /// # Errors
    ///
    /// A [WriteError](WriteError) is returned if the archive is empty, a
    /// field exceeds its encodable size or the backend failed.
    pub fn write<T: Write>(&self, mut backend: T) -> Result<(), WriteError> {
        if self.entries.is_empty() {
            return Err(WriteError::Empty);
        }
        if self.entries.len() > u16::MAX as usize {
            return Err(WriteError::Capacity(self.entries.len()));
        }
        backend.write_all(&SIGNATURE)?;
        let mut word = [0u8; 4];
        LittleEndian::write_u32(&mut word, SUPPORTED_VERSION);
        backend.write_all(&word)?;
        let mut half = [0u8; 2];
        LittleEndian::write_u16(&mut half, self.entries.len() as u16);
        backend.write_all(&half)?;
        for (name, pack) in &self.entries {
            if name.len() > u16::MAX as usize {
                return Err(WriteError::Capacity(name.len()));
            }
            LittleEndian::write_u16(&mut half, name.len() as u16);
            backend.write_all(&half)?;
            backend.write_all(name.as_bytes())?;
            let payload = pack.to_bytes()?;
            if payload.len() > u32::MAX as usize {
                return Err(WriteError::Capacity(payload.len()));
            }
            LittleEndian::write_u32(&mut word, payload.len() as u32);
            backend.write_all(&word)?;
            backend.write_all(&payload)?;
        }
        Ok(())
    }

    /// Encodes this archive into an in-memory buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Reads the binary encoding of an archive.
    ///
    /// # Errors
    ///
    /// A [ReadError](ReadError) is returned if the data is truncated,
    /// carries an unknown signature/version or holds duplicate entries.
    pub fn read<T: Read>(mut backend: T) -> Result<Archive, ReadError> {
        let mut sig = [0u8; 3];
        read_or_eos(&mut backend, &mut sig)?;
        if sig != SIGNATURE {
            return Err(ReadError::BadSignature(sig));
        }
        let mut word = [0u8; 4];
        read_or_eos(&mut backend, &mut word)?;
        let version = LittleEndian::read_u32(&word);
        if version != SUPPORTED_VERSION {
            return Err(ReadError::BadVersion(version));
        }
        let mut half = [0u8; 2];
        read_or_eos(&mut backend, &mut half)?;
        let count = LittleEndian::read_u16(&half);
        let mut archive = Archive::new();
        for _ in 0..count {
            read_or_eos(&mut backend, &mut half)?;
            let len = LittleEndian::read_u16(&half) as usize;
            let mut name = vec![0u8; len];
            read_or_eos(&mut backend, &mut name)?;
            let name = String::from_utf8(name)?;
            read_or_eos(&mut backend, &mut word)?;
            let len = LittleEndian::read_u32(&word) as usize;
            let mut payload = vec![0u8; len];
            read_or_eos(&mut backend, &mut payload)?;
            let pack = StagePack::from_bytes(&payload)?;
            if archive.entries.insert(name.clone(), pack).is_some() {
                return Err(ReadError::DuplicateName(name));
            }
        }
        Ok(archive)
    }

    /// Decodes an archive from an in-memory buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<Archive, ReadError> {
        Archive::read(buf)
    }
}

fn read_or_eos<T: Read>(backend: &mut T, buf: &mut [u8]) -> Result<(), ReadError> {
    backend.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ReadError::Eos,
        _ => ReadError::Io(e),
    })
}
