// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Error taxonomy shared by the gallery modules.
//!
//! Three classes cover everything the gallery does:
//! - [`Error::NotFound`]: missing directory or image, or a path rejected by
//!   root confinement. The server maps this to HTTP 404.
//! - [`Error::Decode`]: malformed image token; handled exactly like a
//!   missing file.
//! - [`Error::Io`]: read/delete failure; logged, and the operation is
//!   abandoned without touching UI state.
//!
//! Per-image failures are always isolated: one bad file never aborts
//! pagination, the load queue, or sibling loads.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("bad image token: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
