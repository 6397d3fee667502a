// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Image tokens: reversible identifiers for gallery paths.
//!
//! The HTTP surface never exposes raw filesystem paths; page listings carry
//! base64-encoded paths and the byte endpoint decodes them back. A decoded
//! path is only ever used after [`confine`] has resolved it under the
//! gallery root - a token naming anything else reads as `NotFound`, so
//! callers cannot distinguish "outside the root" from "absent".

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub fn encode(path: &Path) -> String {
    base64_simd::STANDARD.encode_to_string(path.to_string_lossy().as_bytes())
}

pub fn decode(token: &str) -> Result<PathBuf> {
    let bytes = base64_simd::STANDARD
        .decode_to_vec(token.as_bytes())
        .map_err(|_| Error::Decode(token.to_string()))?;
    let path = String::from_utf8(bytes).map_err(|_| Error::Decode(token.to_string()))?;
    Ok(PathBuf::from(path))
}

/// Resolve `path` and require it to live under `root` (which must already
/// be canonical). Missing files, unresolvable paths, and locations outside
/// the root are all `NotFound`.
pub fn confine(root: &Path, path: &Path) -> Result<PathBuf> {
    let resolved = path
        .canonicalize()
        .map_err(|_| Error::NotFound(path.to_path_buf()))?;
    if !resolved.starts_with(root) {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    Ok(resolved)
}
