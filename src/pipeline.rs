//! Parallel corpus scan
//!
//! One feeder thread reads corpus lines, drops those the keyword prefilter
//! rejects and queues the rest on a bounded channel. A fixed set of worker
//! threads, each owning a [`LineAnalyzer`] built before the scan starts,
//! pull lines from the queue and send their records back. The calling
//! thread is the only one touching the sink, so rows are never interleaved;
//! they appear in completion order, not input order.
//!
//! A failing or panicking line is logged and counted as having no matches.
//! A sink failure stops the scan.

use crate::analyzer::LineAnalyzer;
use crate::error::{AnalysisError, ConfigError, ScanError};
use crate::prefilter::KeywordFilter;
use crate::sink::{MatchRecord, RecordSink};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Lines queued per worker before the feeder blocks
const QUEUE_DEPTH: usize = 16;

type LineOutcome = Result<Vec<MatchRecord>, AnalysisError>;

/// Counters reported at the end of a scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub lines_read: usize,
    pub lines_retained: usize,
    pub lines_processed: usize,
    pub lines_failed: usize,
    pub rows_written: usize,
    pub cancelled: bool,
}

pub struct CorpusScanPipeline {
    workers: usize,
    cancel: Arc<AtomicBool>,
    progress: ProgressBar,
}

impl CorpusScanPipeline {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Share an externally owned cancellation flag (e.g. set from a signal handler)
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `lines` through the prefilter and the analyzers into `sink`
    ///
    /// `make_analyzer` is called once per worker, with the worker index,
    /// before any line is read; its first error aborts the scan.
    pub fn scan<I, A, F, S>(
        &self,
        lines: I,
        filter: &KeywordFilter,
        make_analyzer: F,
        sink: &mut S,
    ) -> Result<ScanSummary, ScanError>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send,
        A: LineAnalyzer,
        F: FnMut(usize) -> Result<A, ConfigError>,
        S: RecordSink + ?Sized,
    {
        let analyzers = (0..self.workers)
            .map(make_analyzer)
            .collect::<Result<Vec<A>, ConfigError>>()?;
        info!("scanning with {} workers", analyzers.len());

        let stop = AtomicBool::new(false);
        let mut summary = thread::scope(|s| -> Result<ScanSummary, ScanError> {
            let (job_tx, job_rx) = mpsc::sync_channel::<(usize, String)>(self.workers * QUEUE_DEPTH);
            let (result_tx, result_rx) = mpsc::channel::<LineOutcome>();
            let job_rx = Arc::new(Mutex::new(job_rx));

            for (index, analyzer) in analyzers.into_iter().enumerate() {
                let jobs = Arc::clone(&job_rx);
                let results = result_tx.clone();
                let cancel = &*self.cancel;
                thread::Builder::new()
                    .name(format!("scan-worker-{}", index))
                    .spawn_scoped(s, move || run_worker(analyzer, jobs, results, cancel))
                    .map_err(ScanError::Worker)?;
            }
            // workers hold the only queue handles now
            drop(job_rx);
            drop(result_tx);

            let feeder = {
                let lines = lines.into_iter();
                let stop = &stop;
                let cancel = &*self.cancel;
                let progress = self.progress.clone();
                s.spawn(move || {
                    let mut read = 0;
                    let mut retained = 0;
                    for line in lines {
                        if cancel.load(Ordering::Relaxed) || stop.load(Ordering::Relaxed) {
                            break;
                        }
                        read += 1;
                        if !filter.retains(&line) {
                            progress.inc(1);
                            continue;
                        }
                        retained += 1;
                        if job_tx.send((read, line)).is_err() {
                            break;
                        }
                    }
                    (read, retained)
                })
            };

            let mut summary = ScanSummary::default();
            let mut failure = None;
            for outcome in result_rx.iter() {
                self.progress.inc(1);
                summary.lines_processed += 1;
                match outcome {
                    Ok(records) => {
                        for record in &records {
                            if let Err(e) = sink.write_record(record) {
                                failure = Some(e);
                                break;
                            }
                            summary.rows_written += 1;
                        }
                    }
                    Err(_) => summary.lines_failed += 1,
                }
                if failure.is_some() {
                    stop.store(true, Ordering::Relaxed);
                    break;
                }
            }
            // unblocks workers still sending results
            drop(result_rx);

            let (read, retained) = match feeder.join() {
                Ok(counts) => counts,
                Err(payload) => panic::resume_unwind(payload),
            };
            summary.lines_read = read;
            summary.lines_retained = retained;

            match failure {
                Some(e) => Err(e.into()),
                None => Ok(summary),
            }
        })?;

        sink.flush()?;
        summary.cancelled = self.cancel.load(Ordering::Relaxed);
        self.progress.finish();

        if summary.cancelled {
            warn!("scan cancelled after {} lines", summary.lines_read);
        }
        info!(
            "read {} lines, {} retained, {} failed, {} rows written",
            summary.lines_read, summary.lines_retained, summary.lines_failed, summary.rows_written
        );
        Ok(summary)
    }
}

fn run_worker<A: LineAnalyzer>(
    mut analyzer: A,
    jobs: Arc<Mutex<Receiver<(usize, String)>>>,
    results: Sender<LineOutcome>,
    cancel: &AtomicBool,
) {
    loop {
        let job = match jobs.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => break,
        };
        let Ok((line_num, line)) = job else {
            break;
        };
        if cancel.load(Ordering::Relaxed) {
            continue;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&line)))
            .unwrap_or_else(|payload| Err(AnalysisError::Panicked(panic_message(payload))));
        if let Err(e) = &outcome {
            warn!("line {} failed ({}): {}", line_num, line, e);
        }
        if results.send(outcome).is_err() {
            break;
        }
    }
    debug!("{} exiting", thread::current().name().unwrap_or("scan worker"));
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BackendError, SinkError};
    use std::io;

    fn echo_words(line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
        Ok(line.split(' ').map(|w| MatchRecord::new(w, "word")).collect())
    }

    fn flaky(line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
        match line {
            "boom" => panic!("analyzer blew up"),
            "bad" => Err(BackendError::Exited.into()),
            _ => echo_words(line),
        }
    }

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    struct Recording {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl LineAnalyzer for Recording {
        fn analyze(&mut self, line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
            self.seen.lock().unwrap().push(line.to_string());
            Ok(Vec::new())
        }
    }

    /// Echoes words and raises the cancel flag on one trigger line
    struct CancelOn {
        trigger: &'static str,
        cancel: Arc<AtomicBool>,
    }

    impl LineAnalyzer for CancelOn {
        fn analyze(&mut self, line: &str) -> Result<Vec<MatchRecord>, AnalysisError> {
            if line == self.trigger {
                self.cancel.store(true, Ordering::Relaxed);
            }
            echo_words(line)
        }
    }

    struct FailingSink;

    impl RecordSink for FailingSink {
        fn write_record(&mut self, _record: &MatchRecord) -> Result<(), SinkError> {
            Err(io::Error::other("disk full").into())
        }
    }

    #[test]
    fn test_rows_match_analyzer_output() {
        let pipeline = CorpusScanPipeline::new(3);
        let mut sink: Vec<MatchRecord> = Vec::new();

        let summary = pipeline
            .scan(
                lines(&["a b", "c", "d e f", "g"]),
                &KeywordFilter::pass_all(),
                |_| Ok(echo_words),
                &mut sink,
            )
            .unwrap();

        assert_eq!(summary.lines_read, 4);
        assert_eq!(summary.lines_processed, 4);
        assert_eq!(summary.rows_written, 7);
        assert!(!summary.cancelled);

        let mut words: Vec<_> = sink.iter().map(|r| r.value.as_str()).collect();
        words.sort_unstable();
        assert_eq!(words, vec!["a", "b", "c", "d", "e", "f", "g"]);
    }

    #[test]
    fn test_filtered_lines_not_analyzed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pipeline = CorpusScanPipeline::new(2);
        let filter = KeywordFilter::new(["横断歩道"]);

        let summary = pipeline
            .scan(
                lines(&["横断歩道を渡る", "歩道を歩く", "広い横断歩道"]),
                &filter,
                |_| {
                    Ok(Recording {
                        seen: Arc::clone(&seen),
                    })
                },
                &mut Vec::<MatchRecord>::new(),
            )
            .unwrap();

        assert_eq!(summary.lines_read, 3);
        assert_eq!(summary.lines_retained, 2);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["広い横断歩道", "横断歩道を渡る"]);
    }

    #[test]
    fn test_failed_lines_contribute_nothing() {
        let pipeline = CorpusScanPipeline::new(2);
        let mut sink: Vec<MatchRecord> = Vec::new();

        let summary = pipeline
            .scan(
                lines(&["a", "bad", "boom", "b c"]),
                &KeywordFilter::pass_all(),
                |_| Ok(flaky),
                &mut sink,
            )
            .unwrap();

        assert_eq!(summary.lines_processed, 4);
        assert_eq!(summary.lines_failed, 2);
        assert_eq!(summary.rows_written, 3);
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_cancelled_before_start() {
        let pipeline = CorpusScanPipeline::new(2);
        pipeline.cancel_flag().store(true, Ordering::Relaxed);
        let mut sink: Vec<MatchRecord> = Vec::new();

        let summary = pipeline
            .scan(lines(&["a", "b"]), &KeywordFilter::pass_all(), |_| Ok(echo_words), &mut sink)
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.lines_read, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_cancelled_mid_scan_keeps_written_rows() {
        let pipeline = CorpusScanPipeline::new(1);
        let cancel = pipeline.cancel_flag();
        let mut corpus = lines(&["a", "b", "stop"]);
        corpus.extend((0..1000).map(|i| format!("w{}", i)));
        let mut sink: Vec<MatchRecord> = Vec::new();

        let summary = pipeline
            .scan(
                corpus,
                &KeywordFilter::pass_all(),
                |_| {
                    Ok(CancelOn {
                        trigger: "stop",
                        cancel: Arc::clone(&cancel),
                    })
                },
                &mut sink,
            )
            .unwrap();

        assert!(summary.cancelled);
        assert!(summary.lines_read < 1003);
        // one worker: nothing after the trigger line is analyzed
        assert_eq!(summary.lines_processed, 3);
        assert_eq!(summary.rows_written, 3);
        let words: Vec<_> = sink.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(words, vec!["a", "b", "stop"]);
    }

    #[test]
    fn test_sink_failure_aborts() {
        let pipeline = CorpusScanPipeline::new(2);
        let many: Vec<String> = (0..500).map(|i| format!("w{}", i)).collect();

        let err = pipeline
            .scan(many, &KeywordFilter::pass_all(), |_| Ok(echo_words), &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, ScanError::Sink(_)));
    }

    #[test]
    fn test_analyzer_setup_failure() {
        let pipeline = CorpusScanPipeline::new(2);
        let result = pipeline.scan(
            lines(&["a"]),
            &KeywordFilter::pass_all(),
            |i| {
                if i == 1 {
                    Err(ConfigError::UnknownKeyword("横断歩道".to_string()))
                } else {
                    Ok(echo_words)
                }
            },
            &mut Vec::<MatchRecord>::new(),
        );
        assert!(matches!(result, Err(ScanError::Config(ConfigError::UnknownKeyword(_)))));
    }

    #[test]
    fn test_empty_corpus() {
        let pipeline = CorpusScanPipeline::new(4);
        let summary = pipeline
            .scan(Vec::new(), &KeywordFilter::pass_all(), |_| Ok(echo_words), &mut Vec::<MatchRecord>::new())
            .unwrap();
        assert_eq!(summary, ScanSummary::default());
    }
}
