#![forbid(unsafe_code)]

//! Background row-band precompute.
//!
//! Grids that shade rows in alternating bands by group need one pass over
//! every row key: the band flips whenever the key differs from the previous
//! row's. [`LabelPrecompute`] runs that pass on a dedicated worker thread so
//! the UI thread only ever reads finished results.
//!
//! # Scheduling
//!
//! - Requests are sent over an `mpsc` channel; the worker drains the queue
//!   and only works on the newest request.
//! - Every request bumps a generation counter. The worker checks it between
//!   chunks and abandons work whose generation is no longer current.
//! - Finished bands land in a `RwLock` cache. The worker is its only writer.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace, warn};

/// Rows processed between generation checks.
const CHUNK: usize = 4096;

/// Shading band of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Even,
    Odd,
}

impl Band {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }
}

/// Bands for `keys`: the first row is [`Band::Even`], and the band flips
/// whenever a key differs from the one before it.
#[must_use]
pub fn compute_bands<K: PartialEq>(keys: &[K]) -> Vec<Band> {
    let mut bands = Vec::with_capacity(keys.len());
    let mut current = Band::Even;
    for (i, key) in keys.iter().enumerate() {
        if i > 0 && keys[i - 1] != *key {
            current = current.flipped();
        }
        bands.push(current);
    }
    bands
}

struct Job<K> {
    generation: u64,
    keys: Vec<K>,
}

#[derive(Default)]
struct Labels {
    generation: u64,
    bands: Vec<Band>,
}

#[derive(Default)]
struct Shared {
    requested: AtomicU64,
    labels: RwLock<Labels>,
    completed: Mutex<u64>,
    completed_cv: Condvar,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.requested.load(Ordering::Acquire) == generation
    }
}

/// Worker thread computing row bands off the UI thread.
pub struct LabelPrecompute<K: PartialEq + Send + 'static> {
    sender: Option<mpsc::Sender<Job<K>>>,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl<K: PartialEq + Send + 'static> std::fmt::Debug for LabelPrecompute<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelPrecompute")
            .field("requested", &self.shared.requested.load(Ordering::Relaxed))
            .field("completed", &self.completed_generation())
            .finish_non_exhaustive()
    }
}

impl<K: PartialEq + Send + 'static> LabelPrecompute<K> {
    /// Spawn the worker.
    pub fn start() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job<K>>();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("tabula-labels".into())
            .spawn(move || worker_loop(&rx, &worker_shared))?;
        Ok(Self {
            sender: Some(tx),
            handle: Some(handle),
            shared,
        })
    }

    /// Queue a pass over `keys`, superseding any pending one. Returns the
    /// request's generation.
    pub fn request(&self, keys: Vec<K>) -> u64 {
        let generation = self.shared.requested.fetch_add(1, Ordering::AcqRel) + 1;
        let sent = self
            .sender
            .as_ref()
            .is_some_and(|tx| tx.send(Job { generation, keys }).is_ok());
        if !sent {
            warn!(message = "labels.worker_gone", generation);
        }
        generation
    }

    /// Generation of the most recently requested pass.
    #[must_use]
    pub fn requested_generation(&self) -> u64 {
        self.shared.requested.load(Ordering::Acquire)
    }

    /// Generation of the bands currently readable.
    #[must_use]
    pub fn completed_generation(&self) -> u64 {
        self.shared
            .labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// Band of `row` from the latest finished pass.
    #[must_use]
    pub fn band(&self, row: usize) -> Option<Band> {
        self.shared
            .labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bands
            .get(row)
            .copied()
    }

    /// Copy of every band from the latest finished pass.
    #[must_use]
    pub fn bands(&self) -> Vec<Band> {
        self.shared
            .labels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .bands
            .clone()
    }

    /// Block until a pass of `generation` or later has finished, or
    /// `timeout` elapses. Returns `true` if it finished.
    pub fn wait_for(&self, generation: u64, timeout: Duration) -> bool {
        let completed = self
            .shared
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (completed, _) = self
            .shared
            .completed_cv
            .wait_timeout_while(completed, timeout, |done| *done < generation)
            .unwrap_or_else(PoisonError::into_inner);
        *completed >= generation
    }
}

impl<K: PartialEq + Send + 'static> Drop for LabelPrecompute<K> {
    fn drop(&mut self) {
        drop(self.sender.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop<K: PartialEq>(rx: &mpsc::Receiver<Job<K>>, shared: &Shared) {
    while let Ok(first) = rx.recv() {
        let mut job = first;
        while let Ok(newer) = rx.try_recv() {
            job = newer;
        }
        if !shared.is_current(job.generation) {
            trace!(message = "labels.skip_stale", generation = job.generation);
            continue;
        }
        let Some(bands) = compute_chunked(&job, shared) else {
            trace!(message = "labels.abandoned", generation = job.generation);
            continue;
        };
        let rows = bands.len();
        {
            let mut labels = shared.labels.write().unwrap_or_else(PoisonError::into_inner);
            labels.generation = job.generation;
            labels.bands = bands;
        }
        {
            let mut completed = shared.completed.lock().unwrap_or_else(PoisonError::into_inner);
            *completed = (*completed).max(job.generation);
        }
        shared.completed_cv.notify_all();
        debug!(message = "labels.done", generation = job.generation, rows);
    }
}

/// Bands for `job`, or `None` once a newer request has arrived.
fn compute_chunked<K: PartialEq>(job: &Job<K>, shared: &Shared) -> Option<Vec<Band>> {
    let keys = &job.keys;
    let mut bands = Vec::with_capacity(keys.len());
    let mut current = Band::Even;
    for (chunk_start, chunk) in keys.chunks(CHUNK).enumerate() {
        if !shared.is_current(job.generation) {
            return None;
        }
        let offset = chunk_start * CHUNK;
        for (i, key) in chunk.iter().enumerate() {
            let row = offset + i;
            if row > 0 && keys[row - 1] != *key {
                current = current.flipped();
            }
            bands.push(current);
        }
    }
    Some(bands)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn bands_flip_on_key_change() {
        let bands = compute_bands(&["a", "a", "b", "c", "c", "a"]);
        assert_eq!(
            bands,
            vec![
                Band::Even,
                Band::Even,
                Band::Odd,
                Band::Even,
                Band::Even,
                Band::Odd,
            ]
        );
        assert!(compute_bands::<u8>(&[]).is_empty());
    }

    #[test]
    fn worker_publishes_bands() {
        let labels = LabelPrecompute::start().unwrap();
        let generation = labels.request(vec![1, 1, 2, 2, 2, 3]);
        assert!(labels.wait_for(generation, WAIT));
        assert_eq!(labels.completed_generation(), generation);
        assert_eq!(labels.band(0), Some(Band::Even));
        assert_eq!(labels.band(2), Some(Band::Odd));
        assert_eq!(labels.band(5), Some(Band::Even));
        assert_eq!(labels.band(6), None);
    }

    #[test]
    fn newest_request_wins() {
        let labels = LabelPrecompute::start().unwrap();
        let big: Vec<u32> = (0..200_000).map(|i| i / 3).collect();
        let first = labels.request(big);
        let second = labels.request(vec![7, 8]);
        assert!(second > first);
        assert!(labels.wait_for(second, WAIT));
        assert_eq!(labels.completed_generation(), second);
        assert_eq!(labels.bands(), vec![Band::Even, Band::Odd]);
    }

    #[test]
    fn chunked_pass_matches_direct_pass() {
        let keys: Vec<u32> = (0..(CHUNK as u32 * 2 + 17)).map(|i| i / 5).collect();
        let shared = Shared::default();
        shared.requested.store(1, Ordering::Release);
        let job = Job {
            generation: 1,
            keys: keys.clone(),
        };
        assert_eq!(compute_chunked(&job, &shared), Some(compute_bands(&keys)));

        shared.requested.store(2, Ordering::Release);
        assert_eq!(compute_chunked(&job, &shared), None);
    }

    #[test]
    fn wait_times_out_for_unrequested_generation() {
        let labels: LabelPrecompute<u8> = LabelPrecompute::start().unwrap();
        assert!(!labels.wait_for(1, Duration::from_millis(20)));
    }
}
