//! Background analysis worker
//!
//! Runs the offline analyzer off the caller's thread, one worker thread per
//! load. Each load gets a new generation number; starting another load makes
//! every earlier one stale. Stale runs stop at their next block and never
//! publish. A finished analysis is published whole, as one `Arc<Analysis>`
//! sent over a channel, so readers never observe a partial frame list.

use crate::nodes::analyzer::{Analysis, OfflineAnalyzer};
use crate::nodes::source::ControlTrackSource;
use crate::nodes::WavFileSource;
use crate::runtime::frame_index::FrameIndex;
use crate::Result;
use crossbeam_channel::{Receiver, Sender};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

type BoxedSource = Box<dyn ControlTrackSource + Send>;

/// Message from a worker thread
struct Published {
    generation: u64,
    label: String,
    result: Result<Arc<Analysis>>,
}

/// Loads recordings in the background and publishes the newest analysis
pub struct AnalysisWorker {
    analyzer: OfflineAnalyzer,
    generation: Arc<AtomicU64>,
    tx: Sender<Published>,
    rx: Receiver<Published>,
    handles: Vec<JoinHandle<()>>,
    latest: Option<Arc<Analysis>>,
}

impl Default for AnalysisWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisWorker {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            analyzer: OfflineAnalyzer::new(),
            generation: Arc::new(AtomicU64::new(0)),
            tx,
            rx,
            handles: Vec::new(),
            latest: None,
        }
    }

    /// Set the analyzer block size used by subsequent loads
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.analyzer = self.analyzer.clone().with_chunk_size(chunk_size);
        self
    }

    /// Generation of the most recent load (0 before the first)
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Most recently accepted analysis
    pub fn latest(&self) -> Option<Arc<Analysis>> {
        self.latest.clone()
    }

    /// Start analyzing a WAV file, superseding any load in progress
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<u64> {
        let path = path.as_ref().to_path_buf();
        let label = path.display().to_string();
        self.spawn(label, move || {
            WavFileSource::open(&path).map(|source| Box::new(source) as BoxedSource)
        })
    }

    /// Start analyzing an already opened source, superseding any load in progress
    pub fn load_source<S>(&mut self, label: impl Into<String>, source: S) -> Result<u64>
    where
        S: ControlTrackSource + Send + 'static,
    {
        self.spawn(label.into(), move || Ok(Box::new(source) as BoxedSource))
    }

    /// Make every load in progress stale without starting a new one
    pub fn cancel(&mut self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Cancelled pending loads (now generation {})", generation);
    }

    /// Collect the newest current result, if one has arrived
    pub fn poll(&mut self) -> Option<Result<Arc<Analysis>>> {
        let mut newest = None;
        while let Ok(msg) = self.rx.try_recv() {
            if let Some(result) = self.accept(msg) {
                newest = Some(result);
            }
        }
        newest
    }

    /// Block until the current load publishes or `timeout` passes
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Arc<Analysis>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            // The worker keeps a sender of its own, so only the timeout ends the wait
            let msg = self.rx.recv_timeout(remaining).ok()?;
            if let Some(result) = self.accept(msg) {
                return Some(result);
            }
        }
    }

    fn accept(&mut self, msg: Published) -> Option<Result<Arc<Analysis>>> {
        if msg.generation != self.current_generation() {
            warn!(
                "Discarding stale analysis of {} (generation {}, current {})",
                msg.label,
                msg.generation,
                self.current_generation()
            );
            return None;
        }
        if let Ok(analysis) = &msg.result {
            self.latest = Some(Arc::clone(analysis));
        }
        Some(msg.result)
    }

    fn spawn<F>(&mut self, label: String, open: F) -> Result<u64>
    where
        F: FnOnce() -> Result<BoxedSource> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let current = Arc::clone(&self.generation);
        let analyzer = self.analyzer.clone();
        let tx = self.tx.clone();

        info!("Loading {} (generation {})", label, generation);

        let handle = std::thread::Builder::new()
            .name(format!("ruxpunk_analyze_{}", generation))
            .spawn(move || {
                let is_current = || current.load(Ordering::Acquire) == generation;
                let result = open().map(|mut source| {
                    let run = analyzer.analyze_while(&mut source, is_current);
                    (run, source.format())
                });

                let result = match result {
                    Ok((run, _)) if !run.completed => {
                        debug!("Analysis of {} superseded, stopping", label);
                        return;
                    }
                    Ok((run, format)) => Ok(Arc::new(Analysis {
                        index: FrameIndex::new(run.frames),
                        format,
                    })),
                    Err(e) => Err(e),
                };

                if !is_current() {
                    debug!("Analysis of {} finished after being superseded", label);
                    return;
                }
                if tx
                    .send(Published {
                        generation,
                        label,
                        result,
                    })
                    .is_err()
                {
                    debug!("Worker dropped before generation {} was published", generation);
                }
            })?;

        self.handles.push(handle);
        Ok(generation)
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        // Stale loads stop at their next block
        self.generation.fetch_add(1, Ordering::AcqRel);

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}
