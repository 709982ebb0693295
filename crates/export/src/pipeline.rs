//! Export pipeline: a worker thread walks the asset list and writes one
//! report file per asset into the output directory.
//!
//! The worker publishes progress over a bounded channel with `try_send`;
//! dropped events are harmless because the authoritative counters live in
//! shared atomics. Cancellation is polled once per asset, so an abort
//! keeps the files already written and skips the rest.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use lc_common::Rational;
use lc_library::AssetItem;
use lc_marker::Marker;
use tracing::{error, info, warn};

use crate::batch::{AbortFlag, BatchJoin, BatchSummary};
use crate::csv::{write_marker_csv, MarkerRow};
use crate::error::{ExportError, ExportResult};
use crate::html::{thumbnail_relative_path, HtmlTemplate, ThumbnailFormat};

/// One asset to export, with its markers and library location.
#[derive(Clone, Debug)]
pub struct ExportAsset {
    pub asset: AssetItem,
    /// Bin path inside the library, for the report columns.
    pub bin_path: String,
    pub markers: Vec<Marker>,
}

/// Output flavor for a job.
#[derive(Clone, Debug)]
pub enum ExportFormat {
    Csv,
    Html {
        template: String,
        thumbnails: ThumbnailFormat,
    },
}

/// Everything the worker needs for one run.
#[derive(Clone, Debug)]
pub struct ExportJob {
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    pub frame_rate: Rational,
    pub assets: Vec<ExportAsset>,
}

/// Renders a poster frame for a marker. HTML exports call this once per
/// marker, from worker threads.
pub trait ThumbnailSource: Send + Sync {
    fn thumbnail(&self, asset: &AssetItem, marker: &Marker) -> io::Result<Vec<u8>>;
}

/// Progress events the worker publishes.
#[derive(Clone, Debug)]
pub enum ExportEvent {
    Started { total: usize },
    AssetDone {
        index: usize,
        name: String,
        succeeded: bool,
    },
    Finished(BatchSummary),
    /// The abort flag was honored; `processed` assets ran before it.
    Cancelled { processed: usize },
}

/// Handle to a running export. Dropping it cancels the worker and waits
/// for it to wind down.
pub struct ExportPipeline {
    total: usize,
    abort: AbortFlag,
    completed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    events_rx: Receiver<ExportEvent>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ExportPipeline {
    /// Spawns the worker thread and returns immediately.
    pub fn start(
        job: ExportJob,
        source: Box<dyn ThumbnailSource>,
    ) -> ExportResult<ExportPipeline> {
        let total = job.assets.len();
        let abort = AbortFlag::new();
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let (events_tx, events_rx) = channel::bounded(64);

        let worker_abort = abort.clone();
        let worker_completed = completed.clone();
        let worker_failed = failed.clone();
        let thread_handle = thread::Builder::new()
            .name("marker-export".into())
            .spawn(move || {
                export_thread(
                    job,
                    source,
                    worker_abort,
                    worker_completed,
                    worker_failed,
                    events_tx,
                );
            })?;

        Ok(ExportPipeline {
            total,
            abort,
            completed,
            failed,
            events_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Drains every event published since the last poll.
    pub fn poll_events(&mut self) -> Vec<ExportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Requests cancellation and waits for the worker to wind down.
    pub fn cancel(&mut self) {
        self.abort.abort();
        self.join();
    }

    /// Waits for the worker and reports the final counts.
    pub fn wait(mut self) -> BatchSummary {
        self.join();
        self.summary()
    }

    /// Counts so far, from the shared atomics.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total,
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("export worker panicked");
            }
        }
    }
}

impl Drop for ExportPipeline {
    fn drop(&mut self) {
        self.abort.abort();
        self.join();
    }
}

fn export_thread(
    job: ExportJob,
    source: Box<dyn ThumbnailSource>,
    abort: AbortFlag,
    completed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
    events: Sender<ExportEvent>,
) {
    let total = job.assets.len();
    let _ = events.try_send(ExportEvent::Started { total });
    info!(total, dir = %job.output_dir.display(), "marker export started");

    if let Err(err) = fs::create_dir_all(&job.output_dir) {
        error!(error = %err, dir = %job.output_dir.display(), "cannot create export directory");
        failed.store(total, Ordering::SeqCst);
        let _ = events.try_send(ExportEvent::Finished(BatchSummary {
            total,
            completed: 0,
            failed: total,
        }));
        return;
    }

    for (index, item) in job.assets.iter().enumerate() {
        if abort.is_aborted() {
            info!(processed = index, "marker export cancelled");
            let _ = events.try_send(ExportEvent::Cancelled { processed: index });
            return;
        }
        let succeeded = match export_asset(&job, item, source.as_ref()) {
            Ok(()) => {
                completed.fetch_add(1, Ordering::SeqCst);
                true
            }
            Err(err) => {
                warn!(asset = %item.asset.name, error = %err, "asset export failed");
                failed.fetch_add(1, Ordering::SeqCst);
                false
            }
        };
        let _ = events.try_send(ExportEvent::AssetDone {
            index,
            name: item.asset.name.clone(),
            succeeded,
        });
    }

    let summary = BatchSummary {
        total,
        completed: completed.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
    };
    info!(
        completed = summary.completed,
        failed = summary.failed,
        "marker export finished"
    );
    let _ = events.try_send(ExportEvent::Finished(summary));
}

/// Writes one asset's report. HTML exports render thumbnails from worker
/// threads first and only persist the document when all of them landed,
/// so a half-exported asset leaves no report behind.
fn export_asset(
    job: &ExportJob,
    item: &ExportAsset,
    source: &dyn ThumbnailSource,
) -> ExportResult<()> {
    let mut rows: Vec<MarkerRow> = item
        .markers
        .iter()
        .map(|marker| {
            MarkerRow::from_marker(&item.asset.name, &item.bin_path, &item.asset.media_path, marker)
        })
        .collect();
    let stem = sanitize_file_name(&item.asset.name);

    match &job.format {
        ExportFormat::Csv => {
            let mut bytes = Vec::new();
            write_marker_csv(&mut bytes, &rows, job.frame_rate)?;
            fs::write(job.output_dir.join(format!("{stem}.csv")), bytes)?;
        }
        ExportFormat::Html { template, thumbnails } => {
            let images_dir = job.output_dir.join("images");
            fs::create_dir_all(&images_dir)?;

            let (done_tx, done_rx) = channel::bounded(1);
            let join = BatchJoin::new(item.markers.len(), move |summary| {
                let _ = done_tx.send(summary);
            });
            thread::scope(|scope| {
                for (index, marker) in item.markers.iter().enumerate() {
                    let join = join.clone();
                    let name = format!("{}_{}", stem, index + 1);
                    let path = images_dir.join(format!("{}.{}", name, thumbnails.extension()));
                    scope.spawn(move || {
                        let ok = match source.thumbnail(&item.asset, marker) {
                            Ok(bytes) => match fs::write(&path, bytes) {
                                Ok(()) => true,
                                Err(err) => {
                                    warn!(path = %path.display(), error = %err, "thumbnail write failed");
                                    false
                                }
                            },
                            Err(err) => {
                                warn!(marker = %marker.name, error = %err, "thumbnail render failed");
                                false
                            }
                        };
                        join.task_done(ok);
                    });
                }
            });
            let summary = done_rx.recv().unwrap_or(BatchSummary {
                total: item.markers.len(),
                completed: 0,
                failed: item.markers.len(),
            });
            if summary.failed > 0 {
                return Err(ExportError::Thumbnails {
                    failed: summary.failed,
                });
            }
            for (index, row) in rows.iter_mut().enumerate() {
                let name = format!("{}_{}", stem, index + 1);
                row.thumbnail = Some(thumbnail_relative_path(&name, *thumbnails));
            }
            let template = HtmlTemplate::parse(template);
            fs::write(
                job.output_dir.join(format!("{stem}.html")),
                template.render(&rows, job.frame_rate),
            )?;
        }
    }
    Ok(())
}

/// Replaces path-hostile characters so asset names can serve as file stems.
fn sanitize_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "untitled".into()
    } else {
        stem
    }
}
