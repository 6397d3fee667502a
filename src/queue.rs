// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Bounded lazy-load queue and loader pool.
//!
//! Decouples "a thumbnail became visible" from the actual byte read:
//! - [`LoadQueue`] holds pending requests, FIFO, with a hard capacity.
//!   Enqueuing at capacity silently drops the oldest pending entry, biasing
//!   the queue towards freshly-visible content.
//! - [`LoaderPool`] performs the reads on a dedicated thread pool with a
//!   fixed number of simultaneous in-flight loads. A failed read is logged
//!   and never blocks sibling loads.
//!
//! There is no cancellation for an in-flight read; a load that completes
//! after its slot scrolled out of view still delivers, and the next
//! visibility recompute revokes the resource. Results are epoch-tagged so
//! that a directory change (which renumbers slots) can discard strays.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// A pending load request for one grid slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueEntry {
    pub slot: usize,
    pub path: PathBuf,
}

/// Loaded image bytes for one slot. Dropping it releases the memory; the
/// browse driver does exactly that when a slot leaves the viewport.
#[derive(Debug)]
pub struct Resource {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

pub struct LoadQueue {
    pending: VecDeque<QueueEntry>,
    members: HashSet<usize>,
    capacity: usize,
}

impl LoadQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            pending: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.members.contains(&slot)
    }

    /// Append a request. A slot already queued is left alone. At capacity
    /// the oldest pending entry is evicted and returned so the caller can
    /// unmark it.
    pub fn enqueue(&mut self, entry: QueueEntry) -> Option<QueueEntry> {
        if self.members.contains(&entry.slot) {
            return None;
        }
        let evicted = if self.pending.len() >= self.capacity {
            let old = self.pending.pop_front();
            if let Some(old) = &old {
                self.members.remove(&old.slot);
            }
            old
        } else {
            None
        };
        self.members.insert(entry.slot);
        self.pending.push_back(entry);
        evicted
    }

    /// Remove and return the oldest pending entry.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        let entry = self.pending.pop_front()?;
        self.members.remove(&entry.slot);
        Some(entry)
    }

    /// Drop everything pending, returning the entries so the caller can
    /// unmark their slots.
    pub fn drain(&mut self) -> Vec<QueueEntry> {
        self.members.clear();
        self.pending.drain(..).collect()
    }
}

pub struct LoadResult {
    pub slot: usize,
    pub path: PathBuf,
    pub epoch: u64,
    /// `None` when the read failed (already logged).
    pub bytes: Option<Vec<u8>>,
}

enum LoadCommand {
    Job { slot: usize, path: PathBuf, epoch: u64 },
    Shutdown,
}

/// Loader thread pool: `threads` simultaneous reads, results delivered
/// through a channel polled by the owner thread.
pub struct LoaderPool {
    command_tx: Sender<LoadCommand>,
    result_rx: Receiver<LoadResult>,
    epoch: Arc<AtomicU64>,
    _handle: JoinHandle<()>,
}

impl LoaderPool {
    pub fn new(threads: usize) -> Self {
        let (command_tx, command_rx) = mpsc::channel::<LoadCommand>();
        let (result_tx, result_rx) = mpsc::channel::<LoadResult>();
        let epoch = Arc::new(AtomicU64::new(0));

        let handle = thread::spawn(move || {
            Self::coordinator_loop(command_rx, result_tx, threads.max(1));
        });

        Self {
            command_tx,
            result_rx,
            epoch,
            _handle: handle,
        }
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate everything submitted so far. Results from older epochs
    /// still arrive but carry their stale tag.
    pub fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn submit(&self, slot: usize, path: PathBuf) {
        let _ = self.command_tx.send(LoadCommand::Job {
            slot,
            path,
            epoch: self.current_epoch(),
        });
    }

    pub fn try_recv(&self) -> Option<LoadResult> {
        self.result_rx.try_recv().ok()
    }

    #[cfg(test)]
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<LoadResult> {
        self.result_rx.recv_timeout(timeout).ok()
    }

    fn coordinator_loop(
        command_rx: Receiver<LoadCommand>,
        result_tx: Sender<LoadResult>,
        threads: usize,
    ) {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .expect("Failed to create loader thread pool");

        while let Ok(cmd) = command_rx.recv() {
            match cmd {
                LoadCommand::Job { slot, path, epoch } => {
                    let result_tx = result_tx.clone();
                    pool.spawn(move || {
                        let bytes = match std::fs::read(&path) {
                            Ok(bytes) => Some(bytes),
                            Err(err) => {
                                eprintln!("sig: load failed for {}: {err}", path.display());
                                None
                            }
                        };
                        let _ = result_tx.send(LoadResult {
                            slot,
                            path,
                            epoch,
                            bytes,
                        });
                    });
                }
                LoadCommand::Shutdown => break,
            }
        }
    }
}

impl Drop for LoaderPool {
    fn drop(&mut self) {
        let _ = self.command_tx.send(LoadCommand::Shutdown);
    }
}
