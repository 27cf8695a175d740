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

//! The runtime stage pack container.
//!
//! A stage pack bundles one compiled variant per target rendering API for a
//! single shader, in either a compact binary container or a JSON document.

pub mod error;

use std::collections::BTreeMap;
use std::collections::btree_map::Values;
use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::shader::{Binding, BindingType, Stage, Target};
use error::{EosContext, InvalidCodeContext, ReadError, WriteError};

/// The standard signature of a binary stage pack.
pub const SIGNATURE: [u8; 3] = *b"RSP";

/// The supported stage pack version for this decoder/encoder.
pub const SUPPORTED_VERSION: u32 = 0x1;

/// One compiled shader variant, ready for packing.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct StageData {
    /// The logical shader name.
    pub shader_name: String,

    /// The target rendering API this variant was compiled for.
    pub target: Target,

    /// The entry point name.
    pub entry_point: String,

    /// The shader stage.
    pub stage: Stage,

    /// The reflected resource bindings.
    pub bindings: Vec<Binding>,

    /// The compiled byte code.
    pub byte_code: Vec<u8>,
}

/// A runtime stage pack.
///
/// Holds at most one [StageData](StageData) per target; serializing an empty
/// pack is an error in both encodings.
///
/// # Examples
///
/// ```
/// use stagec::pack::{StageData, StagePack};
/// use stagec::shader::{Stage, Target};
///
/// let mut pack = StagePack::new();
/// pack.add_stage(StageData {
///     shader_name: "blur".into(),
///     target: Target::Gl40,
///     entry_point: "main".into(),
///     stage: Stage::Pixel,
///     bindings: Vec::new(),
///     byte_code: vec![1, 2, 3],
/// }).unwrap();
/// let bytes = pack.to_bytes().unwrap();
/// let decoded = StagePack::from_bytes(&bytes).unwrap();
/// assert_eq!(decoded.len(), 1);
/// let stage = decoded.get(Target::Gl40).unwrap();
/// assert_eq!(stage.entry_point, "main");
/// assert_eq!(stage.byte_code, vec![1, 2, 3]);
/// ```
#[derive(Default, Debug)]
pub struct StagePack {
    stages: BTreeMap<Target, StageData>,
}

impl StagePack {
    pub fn new() -> StagePack {
        StagePack {
            stages: BTreeMap::new(),
        }
    }

    /// Adds a compiled variant into this pack.
    ///
    /// # Arguments
    ///
    /// * `data`: the [StageData](StageData) to add.
    ///
    /// returns: Result<(), WriteError>
    ///
    /// # Errors
    ///
    /// A [WriteError](crate::pack::error::WriteError) is returned if the pack
    /// already holds a stage for the same target.
    pub fn add_stage(&mut self, data: StageData) -> Result<(), WriteError> {
        if self.stages.contains_key(&data.target) {
            return Err(WriteError::DuplicateTarget(data.target));
        }
        self.stages.insert(data.target, data);
        Ok(())
    }

    /// Returns the number of stages contained in this pack.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns the stage compiled for the given target, if any.
    pub fn get(&self, target: Target) -> Option<&StageData> {
        self.stages.get(&target)
    }

    /// Iterates over all stages, ordered by target.
    pub fn stages(&self) -> Values<'_, Target, StageData> {
        self.stages.values()
    }

    /// Writes the binary encoding of this pack.
    ///
    /// # Errors
    ///
    /// A [WriteError](crate::pack::error::WriteError) is returned if the pack
    /// is empty, a field exceeds its encodable size or the backend failed.
    pub fn write<T: Write>(&self, mut backend: T) -> Result<(), WriteError> {
        if self.stages.is_empty() {
            return Err(WriteError::Empty);
        }
        if self.stages.len() > u16::MAX as usize {
            return Err(WriteError::Capacity(self.stages.len()));
        }
        let mut word = [0u8; 4];
        backend.write_all(&SIGNATURE)?;
        LittleEndian::write_u32(&mut word, SUPPORTED_VERSION);
        backend.write_all(&word)?;
        let mut half = [0u8; 2];
        LittleEndian::write_u16(&mut half, self.stages.len() as u16);
        backend.write_all(&half)?;
        for data in self.stages.values() {
            write_stage(&mut backend, data)?;
        }
        Ok(())
    }

    /// Encodes this pack into an in-memory binary buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        let mut buf = Vec::new();
        self.write(&mut buf)?;
        Ok(buf)
    }

    /// Encodes this pack as a JSON document.
    ///
    /// # Errors
    ///
    /// A [WriteError](crate::pack::error::WriteError) is returned if the pack
    /// is empty or the document could not be encoded.
    pub fn to_json(&self) -> Result<Vec<u8>, WriteError> {
        if self.stages.is_empty() {
            return Err(WriteError::Empty);
        }
        let records: Vec<&StageData> = self.stages.values().collect();
        let mut buf = serde_json::to_vec_pretty(&records)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Reads the binary encoding of a pack.
    ///
    /// # Errors
    ///
    /// A [ReadError](crate::pack::error::ReadError) is returned if the data
    /// is truncated, carries an unknown signature/version/code or holds two
    /// stages for one target.
    pub fn read<T: Read>(mut backend: T) -> Result<StagePack, ReadError> {
        let mut sig = [0u8; 3];
        read_or_eos(&mut backend, &mut sig, EosContext::Header)?;
        if sig != SIGNATURE {
            return Err(ReadError::BadSignature(sig));
        }
        let mut word = [0u8; 4];
        read_or_eos(&mut backend, &mut word, EosContext::Header)?;
        let version = LittleEndian::read_u32(&word);
        if version != SUPPORTED_VERSION {
            return Err(ReadError::BadVersion(version));
        }
        let mut half = [0u8; 2];
        read_or_eos(&mut backend, &mut half, EosContext::Header)?;
        let count = LittleEndian::read_u16(&half);
        let mut pack = StagePack::new();
        for _ in 0..count {
            let data = read_stage(&mut backend)?;
            let target = data.target;
            if pack.stages.insert(target, data).is_some() {
                return Err(ReadError::DuplicateTarget(target));
            }
        }
        Ok(pack)
    }

    /// Decodes a pack from an in-memory binary buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<StagePack, ReadError> {
        StagePack::read(buf)
    }

    /// Decodes a pack from its JSON document form.
    ///
    /// # Errors
    ///
    /// A [ReadError](crate::pack::error::ReadError) is returned if the
    /// document is malformed or holds two stages for one target.
    pub fn from_json(buf: &[u8]) -> Result<StagePack, ReadError> {
        let records: Vec<StageData> = serde_json::from_slice(buf)?;
        let mut pack = StagePack::new();
        for data in records {
            let target = data.target;
            if pack.stages.insert(target, data).is_some() {
                return Err(ReadError::DuplicateTarget(target));
            }
        }
        Ok(pack)
    }
}

fn write_str<T: Write>(backend: &mut T, s: &str) -> Result<(), WriteError> {
    if s.len() > u16::MAX as usize {
        return Err(WriteError::Capacity(s.len()));
    }
    let mut half = [0u8; 2];
    LittleEndian::write_u16(&mut half, s.len() as u16);
    backend.write_all(&half)?;
    backend.write_all(s.as_bytes())?;
    Ok(())
}

fn write_stage<T: Write>(backend: &mut T, data: &StageData) -> Result<(), WriteError> {
    backend.write_all(&[data.target.code(), data.stage.code()])?;
    write_str(backend, &data.shader_name)?;
    write_str(backend, &data.entry_point)?;
    if data.bindings.len() > u16::MAX as usize {
        return Err(WriteError::Capacity(data.bindings.len()));
    }
    let mut half = [0u8; 2];
    LittleEndian::write_u16(&mut half, data.bindings.len() as u16);
    backend.write_all(&half)?;
    for binding in &data.bindings {
        write_str(backend, &binding.name)?;
        backend.write_all(&[binding.ty.code(), binding.register])?;
    }
    if data.byte_code.len() > u32::MAX as usize {
        return Err(WriteError::Capacity(data.byte_code.len()));
    }
    let mut word = [0u8; 4];
    LittleEndian::write_u32(&mut word, data.byte_code.len() as u32);
    backend.write_all(&word)?;
    backend.write_all(&data.byte_code)?;
    Ok(())
}

fn read_or_eos<T: Read>(backend: &mut T, buf: &mut [u8], ctx: EosContext) -> Result<(), ReadError> {
    backend.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => ReadError::Eos(ctx),
        _ => ReadError::Io(e),
    })
}

fn read_str<T: Read>(backend: &mut T, ctx: EosContext) -> Result<String, ReadError> {
    let mut half = [0u8; 2];
    read_or_eos(backend, &mut half, ctx)?;
    let len = LittleEndian::read_u16(&half) as usize;
    let mut buf = vec![0u8; len];
    read_or_eos(backend, &mut buf, ctx)?;
    Ok(String::from_utf8(buf)?)
}

fn read_stage<T: Read>(backend: &mut T) -> Result<StageData, ReadError> {
    let mut codes = [0u8; 2];
    read_or_eos(backend, &mut codes, EosContext::Record)?;
    let target = Target::from_code(codes[0])
        .ok_or(ReadError::InvalidCode(InvalidCodeContext::Target, codes[0]))?;
    let stage = Stage::from_code(codes[1])
        .ok_or(ReadError::InvalidCode(InvalidCodeContext::Stage, codes[1]))?;
    let shader_name = read_str(backend, EosContext::Record)?;
    let entry_point = read_str(backend, EosContext::Record)?;
    let mut half = [0u8; 2];
    read_or_eos(backend, &mut half, EosContext::Binding)?;
    let count = LittleEndian::read_u16(&half) as usize;
    let mut bindings = Vec::with_capacity(count);
    for _ in 0..count {
        let name = read_str(backend, EosContext::Binding)?;
        let mut pair = [0u8; 2];
        read_or_eos(backend, &mut pair, EosContext::Binding)?;
        let ty = BindingType::from_code(pair[0])
            .ok_or(ReadError::InvalidCode(InvalidCodeContext::BindingType, pair[0]))?;
        bindings.push(Binding {
            name,
            ty,
            register: pair[1],
        });
    }
    let mut word = [0u8; 4];
    read_or_eos(backend, &mut word, EosContext::ByteCode)?;
    let len = LittleEndian::read_u32(&word) as usize;
    let mut byte_code = vec![0u8; len];
    read_or_eos(backend, &mut byte_code, EosContext::ByteCode)?;
    Ok(StageData {
        shader_name,
        target,
        entry_point,
        stage,
        bindings,
        byte_code,
    })
}
