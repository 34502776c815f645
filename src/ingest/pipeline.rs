//! Ingest Pipeline
//!
//! Double-buffered line import: the caller's thread parses lines into one
//! batch while an inserter thread stores the other.
//!
//! ```text
//!            free (bounded 2)
//!      ┌────────────────────────────┐
//!      │                            │
//!      ▼                            │
//! ┌──────────┐   work (bounded 2)  ┌┴──────────┐
//! │ producer │ ──────────────────► │ inserter  │ ──► BatchSink::put_bulk
//! │ (parse)  │  Batch | Shutdown   │ (thread)  │
//! └──────────┘                     └───────────┘
//! ```
//! Exactly two batches circulate, so at most one is being filled while the
//! other is stored. Batches are stored in the order they were filled.

use std::io::BufRead;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::config::{IngestConfig, InsertFailurePolicy};
use crate::error::{RecordKvError, Result};
use crate::record::{Batch, Record};
use crate::schema::Schema;

use super::bulk::{bulk_parse, BulkIssue, BulkParseOptions};
use super::descriptor::ParseDescriptor;
use super::line::{parse_line, strip_line_end};

/// Number of batches in circulation
const NUM_BATCHES: usize = 2;

/// Destination for full batches
pub trait BatchSink: Send + Sync {
    fn put_bulk(&self, batch: &Batch) -> Result<()>;
}

/// Notification passed to an import callback
#[derive(Debug)]
pub enum IngestEvent<'a> {
    /// Running totals, emitted every `progress_every` lines
    Progress { lines_read: u64, lines_ok: u64 },
    /// A line that did not parse (only with `report_failures`)
    Failure {
        error: &'a RecordKvError,
        line: &'a [u8],
    },
}

/// Totals after `stop()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub lines_read: u64,
    pub lines_ok: u64,
    pub batches_stored: u64,
    pub records_stored: u64,
    /// Records lost to storage failures
    pub records_dropped: u64,
}

enum Packet {
    Batch(Batch),
    Shutdown,
}

#[derive(Default)]
struct InserterStats {
    batches_stored: u64,
    records_stored: u64,
    records_dropped: u64,
    failure: Option<RecordKvError>,
}

struct Running {
    free_rx: Receiver<Batch>,
    work_tx: Sender<Packet>,
    handle: JoinHandle<InserterStats>,
    /// Partially filled batch kept between imports
    current: Option<Batch>,
}

impl Running {
    /// Hand the full `batch` to the inserter and continue with a free one
    fn cycle(&self, batch: &mut Batch) -> Result<()> {
        let next = self.free_rx.recv().map_err(|_| inserter_gone())?;
        let full = std::mem::replace(batch, next);
        self.work_tx
            .send(Packet::Batch(full))
            .map_err(|_| inserter_gone())
    }

    /// The batch to continue filling
    fn take_current(&mut self) -> Result<Batch> {
        match self.current.take() {
            Some(batch) => Ok(batch),
            None => self.free_rx.recv().map_err(|_| inserter_gone()),
        }
    }
}

fn inserter_gone() -> RecordKvError {
    RecordKvError::InsertFailed("inserter thread is gone".to_string())
}

/// Line importer feeding a `BatchSink`
///
/// ## Lifecycle
/// ```text
/// new ──► start ──► import* ──► stop ──► (start again ...)
/// ```
/// Dropping a running pipeline stops it and discards the report.
pub struct IngestPipeline<S: BatchSink + 'static> {
    sink: Arc<S>,
    schema: Arc<Schema>,
    descriptor: ParseDescriptor,
    config: IngestConfig,
    /// Parse scratch
    record: Record,
    lines_read: u64,
    lines_ok: u64,
    running: Option<Running>,
}

impl<S: BatchSink + 'static> IngestPipeline<S> {
    pub fn new(
        sink: Arc<S>,
        schema: &Arc<Schema>,
        descriptor: ParseDescriptor,
        config: IngestConfig,
    ) -> Self {
        Self {
            sink,
            schema: Arc::clone(schema),
            descriptor,
            config,
            record: Record::new(schema),
            lines_read: 0,
            lines_ok: 0,
            running: None,
        }
    }

    /// Start, import `input`, stop
    pub fn run<R: BufRead>(
        sink: Arc<S>,
        schema: &Arc<Schema>,
        descriptor: ParseDescriptor,
        config: IngestConfig,
        input: R,
    ) -> Result<IngestReport> {
        let mut pipeline = Self::new(sink, schema, descriptor, config);
        pipeline.start()?;
        pipeline.import(input)?;
        pipeline.stop()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// `(lines_read, lines_ok)` since construction
    pub fn totals(&self) -> (u64, u64) {
        (self.lines_read, self.lines_ok)
    }

    /// Allocate the batches and spawn the inserter
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(RecordKvError::AlreadyStarted);
        }

        let (free_tx, free_rx) = bounded::<Batch>(NUM_BATCHES);
        let (work_tx, work_rx) = bounded::<Packet>(NUM_BATCHES);
        for _ in 0..NUM_BATCHES {
            free_tx
                .send(Batch::fixed(&self.schema, self.config.batch_capacity))
                .map_err(|_| inserter_gone())?;
        }

        let sink = Arc::clone(&self.sink);
        let policy = self.config.failure_policy;
        let handle = thread::Builder::new()
            .name("recordkv-inserter".to_string())
            .spawn(move || run_inserter(&*sink, policy, work_rx, free_tx))?;

        info!(
            batch_capacity = self.config.batch_capacity,
            policy = ?self.config.failure_policy,
            "Started inserter"
        );

        self.running = Some(Running {
            free_rx,
            work_tx,
            handle,
            current: None,
        });
        Ok(())
    }

    /// Import every line of `input`; returns `(lines_read, lines_ok)` for this call
    pub fn import<R: BufRead>(&mut self, input: R) -> Result<(u64, u64)> {
        self.import_with(input, |_| {})
    }

    /// Like `import`, reporting failures and progress to `callback`
    pub fn import_with<R, F>(&mut self, mut input: R, mut callback: F) -> Result<(u64, u64)>
    where
        R: BufRead,
        F: FnMut(IngestEvent<'_>),
    {
        let running = self.running.as_mut().ok_or(RecordKvError::NotStarted)?;
        let sep = self.config.separator;
        let report_failures = self.config.report_failures;
        let progress_every = self.config.progress_every.filter(|&n| n > 0);

        let mut batch = running.take_current()?;
        let (start_read, start_ok) = (self.lines_read, self.lines_ok);
        let (mut lines_read, mut lines_ok) = (start_read, start_ok);
        let mut line = Vec::new();

        let outcome = (|| -> Result<()> {
            loop {
                line.clear();
                if input.read_until(b'\n', &mut line)? == 0 {
                    return Ok(());
                }
                lines_read += 1;

                if batch.is_full() {
                    running.cycle(&mut batch)?;
                }

                match parse_line(&mut self.record, &line, &self.descriptor, sep) {
                    Ok(_) => {
                        batch.push(&self.record)?;
                        lines_ok += 1;
                    }
                    Err(e) => {
                        if report_failures {
                            callback(IngestEvent::Failure {
                                error: &e,
                                line: strip_line_end(&line),
                            });
                        }
                    }
                }

                if let Some(n) = progress_every {
                    if lines_read % n == 0 {
                        callback(IngestEvent::Progress {
                            lines_read,
                            lines_ok,
                        });
                    }
                }
            }
        })();

        running.current = Some(batch);
        self.lines_read = lines_read;
        self.lines_ok = lines_ok;
        outcome?;

        debug!(
            lines_read = lines_read - start_read,
            lines_ok = lines_ok - start_ok,
            "Import finished"
        );
        Ok((lines_read - start_read, lines_ok - start_ok))
    }

    /// Strict import parsing straight into the batches
    ///
    /// `on_issue` is consulted for lines the options do not reject outright;
    /// returning `true` keeps the record.
    pub fn import_fast<R, F>(
        &mut self,
        mut input: R,
        options: &BulkParseOptions,
        mut on_issue: F,
    ) -> Result<(u64, u64)>
    where
        R: BufRead,
        F: FnMut(&BulkIssue<'_>) -> bool,
    {
        let running = self.running.as_mut().ok_or(RecordKvError::NotStarted)?;
        let sep = self.config.separator;

        let mut batch = running.take_current()?;
        let (mut lines_read, mut lines_ok) = (0u64, 0u64);

        let outcome = (|| -> Result<()> {
            loop {
                let before = batch.len();
                let step = bulk_parse(
                    &mut input,
                    &mut batch,
                    &mut self.record,
                    &self.descriptor,
                    sep,
                    options,
                    &mut on_issue,
                )?;
                lines_read += step.lines_read;
                lines_ok += (batch.len() - before) as u64;
                if !step.more {
                    return Ok(());
                }
                running.cycle(&mut batch)?;
            }
        })();

        running.current = Some(batch);
        self.lines_read += lines_read;
        self.lines_ok += lines_ok;
        outcome?;

        debug!(lines_read, lines_ok, "Strict import finished");
        Ok((lines_read, lines_ok))
    }

    /// Flush partial batches, shut the inserter down and report totals
    ///
    /// Fails with `InsertFailed` if storing stopped under the `Halt` or
    /// `Retry` policies.
    pub fn stop(&mut self) -> Result<IngestReport> {
        let mut running = self.running.take().ok_or(RecordKvError::NotStarted)?;

        for _ in 0..NUM_BATCHES {
            let batch = running.take_current()?;
            running
                .work_tx
                .send(Packet::Batch(batch))
                .map_err(|_| inserter_gone())?;
        }
        running
            .work_tx
            .send(Packet::Shutdown)
            .map_err(|_| inserter_gone())?;

        let stats = running
            .handle
            .join()
            .map_err(|_| RecordKvError::InsertFailed("inserter thread panicked".to_string()))?;

        let report = IngestReport {
            lines_read: self.lines_read,
            lines_ok: self.lines_ok,
            batches_stored: stats.batches_stored,
            records_stored: stats.records_stored,
            records_dropped: stats.records_dropped,
        };
        info!(
            lines_read = report.lines_read,
            lines_ok = report.lines_ok,
            records_stored = report.records_stored,
            records_dropped = report.records_dropped,
            "Stopped inserter"
        );

        match stats.failure {
            Some(e) => Err(RecordKvError::InsertFailed(e.to_string())),
            None => Ok(report),
        }
    }
}

impl<S: BatchSink + 'static> Drop for IngestPipeline<S> {
    fn drop(&mut self) {
        if self.running.is_some() {
            if let Err(e) = self.stop() {
                error!(error = %e, "Inserter stopped with an error during drop");
            }
        }
    }
}

// =============================================================================
// Inserter Thread
// =============================================================================

fn run_inserter<S: BatchSink + ?Sized>(
    sink: &S,
    policy: InsertFailurePolicy,
    work: Receiver<Packet>,
    free: Sender<Batch>,
) -> InserterStats {
    let mut stats = InserterStats::default();

    while let Ok(Packet::Batch(mut batch)) = work.recv() {
        if !batch.is_empty() {
            store(sink, policy, &batch, &mut stats);
        }
        batch.reset();
        if free.send(batch).is_err() {
            break;
        }
    }
    stats
}

fn store<S: BatchSink + ?Sized>(
    sink: &S,
    policy: InsertFailurePolicy,
    batch: &Batch,
    stats: &mut InserterStats,
) {
    let records = batch.len() as u64;
    if stats.failure.is_some() {
        stats.records_dropped += records;
        return;
    }

    let mut attempt = 0u32;
    loop {
        let e = match sink.put_bulk(batch) {
            Ok(()) => {
                stats.batches_stored += 1;
                stats.records_stored += records;
                return;
            }
            Err(e) => e,
        };

        match policy {
            InsertFailurePolicy::Drop => {
                warn!(records, error = %e, "Dropping batch after failed insert");
                stats.records_dropped += records;
                return;
            }
            InsertFailurePolicy::Retry { attempts, backoff } if attempt < attempts => {
                attempt += 1;
                warn!(attempt, attempts, error = %e, "Retrying failed insert");
                thread::sleep(backoff);
            }
            _ => {
                error!(records, error = %e, "Insert failed; halting inserter");
                stats.records_dropped += records;
                stats.failure = Some(e);
                return;
            }
        }
    }
}
