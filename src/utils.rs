// Copyright (c) 2021, BlockProject 3D
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

//! Contains various utilities to be used by other modules.

use std::io::{self, Write};
use std::num::Wrapping;
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Hash text using the DJB2 hash function.
///
/// # Arguments
///
/// * `s`: the string to compute the hash of.
///
/// returns: u64
///
/// # Examples
///
/// ```
/// use stagec::utils::hash;
///
/// let s = "MyString";
/// assert_eq!(hash(s), hash("MyString"));
/// assert_eq!(hash(s), hash(s));
/// assert_ne!(hash(s), hash("Wrong"));
/// ```
pub fn hash(s: &str) -> u64 {
    let mut val: Wrapping<u64> = Wrapping(5381);

    for v in s.as_bytes() {
        val = ((val << 5) + val) + Wrapping(*v as u64);
    }
    val.0
}

/// Infers the logical shader name from a source file path.
///
/// The name is the file name with every extension removed; a path with no
/// usable file name infers the name `unnamed`.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use stagec::utils::infer_shader_name;
///
/// assert_eq!(infer_shader_name(Path::new("shaders/blur.frag.glsl")), "blur");
/// assert_eq!(infer_shader_name(Path::new("shaders/blur.frag")), "blur");
/// ```
pub fn infer_shader_name(path: &Path) -> String {
    path.file_name()
        .and_then(|v| v.to_str())
        .and_then(|v| v.split('.').next())
        .filter(|v| !v.is_empty())
        .unwrap_or("unnamed")
        .into()
}

/// Resolves a path to absolute form against the process working directory.
///
/// # Errors
///
/// Returns an [Error](std::io::Error) if the working directory could not be
/// determined.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.into());
    }
    Ok(std::env::current_dir()?.join(path))
}

/// Writes a byte buffer to the given path such that a concurrent reader
/// observes either the previous file content or the full new content, never
/// a mix.
///
/// The parent directory of `path` must already exist.
///
/// # Arguments
///
/// * `path`: the destination path.
/// * `data`: the bytes to write.
///
/// # Errors
///
/// Returns an [Error](std::io::Error) if the temporary file could not be
/// created, written or persisted to `path`.
pub fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.flush()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Widens the access mode of a written artifact to 0644 so tools running
/// under a different privilege context can read it.
///
/// *On non-unix platforms this is a no-op.*
#[cfg(unix)]
pub fn set_permissive_access(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
pub fn set_permissive_access(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Installs the process-wide crash reporting hook.
///
/// The hook routes panic reports through the logging stack before the
/// default handler runs. Installation is idempotent; calling this more than
/// once has no further effect.
pub fn install_crash_handler() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            log::error!("fatal internal error: {}", info);
            previous(info);
        }));
    });
}
