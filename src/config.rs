// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Configuration management.
//!
//! Config values are loaded with the following priority (highest to lowest):
//! 1. Environment variables (SIG_*)
//! 2. Config file (~/.config/sig/config.toml)
//! 3. Default values

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bind address for the gallery server.
    pub bind: String,
    /// Images per page in the terminal browser grid.
    pub page_size: usize,
    /// Recursion bound for the server-side directory walk.
    pub scan_depth: usize,
    /// Capacity of the pending lazy-load queue.
    pub queue_size: usize,
    /// Simultaneous in-flight image loads.
    pub load_threads: usize,
    /// Quiet period before a visibility recompute runs.
    pub debounce_ms: u64,
    /// Slideshow auto-advance interval.
    pub slideshow_ms: u64,
    /// Folder-tree cache time-to-live.
    pub cache_ttl_secs: u64,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8390".to_string(),
            page_size: 10,
            scan_depth: 16,
            queue_size: 10,
            load_threads: 10,
            debounce_ms: 100,
            slideshow_ms: 5_000,
            cache_ttl_secs: 86_400,
            debug: false,
        }
    }
}

impl Config {
    /// Load config with priority: env vars > config file > defaults
    pub fn load() -> Self {
        let mut config = Self::load_from_file().unwrap_or_default();
        config.apply_env_overrides();
        config.clamp_values();
        config
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sig").join("config.toml"))
    }

    fn load_from_file() -> Option<Self> {
        let path = Self::config_path()?;
        let content = std::fs::read_to_string(path).ok()?;
        toml::from_str(&content).ok()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SIG_BIND") {
            self.bind = v;
        }
        if let Some(v) = Self::parse_env::<usize>("SIG_PAGE_SIZE") {
            self.page_size = v;
        }
        if let Some(v) = Self::parse_env::<usize>("SIG_SCAN_DEPTH") {
            self.scan_depth = v;
        }
        if let Some(v) = Self::parse_env::<usize>("SIG_QUEUE_SIZE") {
            self.queue_size = v;
        }
        if let Some(v) = Self::parse_env::<usize>("SIG_LOAD_THREADS") {
            self.load_threads = v;
        }
        if let Some(v) = Self::parse_env::<u64>("SIG_DEBOUNCE_MS") {
            self.debounce_ms = v;
        }
        if let Some(v) = Self::parse_env::<u64>("SIG_SLIDESHOW_MS") {
            self.slideshow_ms = v;
        }
        if let Some(v) = Self::parse_env::<u64>("SIG_CACHE_TTL_SECS") {
            self.cache_ttl_secs = v;
        }
        if std::env::var_os("SIG_DEBUG").is_some() {
            self.debug = true;
        }
    }

    fn clamp_values(&mut self) {
        const MAX_PAGE_SIZE: usize = 500;
        const MAX_SCAN_DEPTH: usize = 64;
        const MAX_QUEUE_SIZE: usize = 512;
        const MAX_LOAD_THREADS: usize = 32;
        const MIN_SLIDESHOW_MS: u64 = 500;
        const MAX_DEBOUNCE_MS: u64 = 5_000;

        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self.scan_depth = self.scan_depth.clamp(1, MAX_SCAN_DEPTH);
        self.queue_size = self.queue_size.clamp(1, MAX_QUEUE_SIZE);
        self.load_threads = self.load_threads.clamp(1, MAX_LOAD_THREADS);
        self.slideshow_ms = self.slideshow_ms.max(MIN_SLIDESHOW_MS);
        self.debounce_ms = self.debounce_ms.clamp(1, MAX_DEBOUNCE_MS);
    }

    fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok()?.parse().ok()
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn slideshow_interval(&self) -> Duration {
        Duration::from_millis(self.slideshow_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
