// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Application entry point.
//!
//! This module:
//! - parses CLI args (`serve` / `browse` subcommands)
//! - resolves the gallery root (`SIG_GALLERY_DIR` > CLI argument > cwd)
//! - dispatches to the HTTP server or the terminal browser
//!
//! All browsing state lives in `Viewer` (see `src/viewer.rs`); terminal
//! handling is centralized in `src/browse.rs`.

mod browse;
mod config;
mod debounce;
mod error;
mod page;
mod queue;
mod scan;
mod serve;
mod token;
mod tree_cache;
mod viewer;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;

const ROOT_ENV: &str = "SIG_GALLERY_DIR";

#[derive(Parser, Debug)]
#[command(name = "sig", about = "Simple Image Gallery")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a paginated photo gallery over HTTP
    Serve {
        /// Gallery root (default: SIG_GALLERY_DIR, then the current directory)
        root: Option<PathBuf>,
        /// Bind address, e.g. 127.0.0.1:8390
        #[arg(long)]
        bind: Option<String>,
    },
    /// Browse a folder of images in the terminal
    Browse {
        /// Folder to open (default: SIG_GALLERY_DIR, then the current directory)
        root: Option<PathBuf>,
    },
}

/// Resolve the gallery root. The environment wins over the CLI argument;
/// with neither, the current directory is used. Returns whether the
/// environment pinned it (a pinned root disables per-request overrides).
fn resolve_root(cli_root: Option<PathBuf>) -> Result<(PathBuf, bool)> {
    if let Some(dir) = std::env::var_os(ROOT_ENV) {
        let dir = PathBuf::from(dir);
        if !dir.is_dir() {
            anyhow::bail!("{ROOT_ENV} is not a directory: {:?}", dir);
        }
        return Ok((dir, true));
    }
    if let Some(dir) = cli_root {
        if !dir.is_dir() {
            anyhow::bail!("Not a directory: {:?}", dir);
        }
        return Ok((dir, false));
    }
    Ok((std::env::current_dir()?, false))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    match cli.command {
        Command::Serve { root, bind } => {
            let (root, pinned) = resolve_root(root)?;
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let gallery = serve::Gallery::new(root, pinned, &config)?;
            gallery.run(&bind)
        }
        Command::Browse { root } => {
            let (root, _) = resolve_root(root)?;
            browse::run(root, config)
        }
    }
}
