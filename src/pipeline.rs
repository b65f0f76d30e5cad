use crate::capture::{FrameSource, ScreenCapturer};
use crate::csv_writer::{ReadingRecord, ReadingsLog};
use crate::error::Result;
use crate::ocr::{self, Recognizer};
use crate::region::{self, Region};
use crate::stop_flag::StopFlag;
use crate::tesseract::TextRecognizer;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Why the loop stopped gracefully. Anything else leaves `run` as an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop flag file existed with content `stop` and was consumed
    FlagHonored,
    /// The process-level interrupt (Ctrl-C) was raised
    Interrupted,
}

/// The capture->recognize->log pipeline.
///
/// Owns all collaborator configuration explicitly; construct once, configure
/// with the setters, then block on [`CaptureLoop::run`]. One cycle captures
/// every configured region in order, recognizes each frame with a single
/// shared OCR engine, and appends one timestamped row to the readings log.
///
/// The loop is single-threaded and cooperative: cancellation is sampled once
/// per cycle, before any capture starts, so a stop request never truncates a
/// cycle into a partial record.
pub struct CaptureLoop {
    regions_file: PathBuf,
    log_file: PathBuf,
    stop_flag_file: PathBuf,
    interval: Duration,
    tessdata_dir: Option<PathBuf>,
    language: String,
    interrupted: Option<Arc<AtomicBool>>,
}

impl Default for CaptureLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureLoop {
    pub fn new() -> Self {
        CaptureLoop {
            regions_file: "rois.txt".into(),
            log_file: "readings.csv".into(),
            stop_flag_file: "stop_logging.txt".into(),
            interval: Duration::from_millis(500),
            tessdata_dir: None,
            language: "eng".into(),
            interrupted: None,
        }
    }

    // --- Getters and setters ---
    pub fn set_regions_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.regions_file = path.into();
        self
    }

    pub fn set_log_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.log_file = path.into();
        self
    }

    pub fn set_stop_flag_file(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.stop_flag_file = path.into();
        self
    }

    /// Wall-clock delay between cycles (default 500ms).
    pub fn set_interval(&mut self, interval: Duration) -> &mut Self {
        self.interval = interval;
        self
    }

    /// Directory holding `<language>.traineddata`. Defaults to the directory
    /// of the running executable.
    pub fn set_tessdata_dir(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.tessdata_dir = Some(path.into());
        self
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.language = language.into();
        self
    }

    /// Shared flag raised by the process-level interrupt handler. Observed at
    /// the top of each cycle, ahead of the stop flag file.
    pub fn set_interrupt_flag(&mut self, flag: Arc<AtomicBool>) -> &mut Self {
        self.interrupted = Some(flag);
        self
    }

    // --- Behavior ---
    /// Initializes the OCR engine and region list, then cycles until a stop
    /// request or a fatal error.
    ///
    /// Startup failures (missing/malformed region file, engine init) are
    /// fatal before the first cycle. Mid-loop capture, recognition, and
    /// persistence failures are not caught here either -- they propagate and
    /// end the process, which is expected to be supervised externally.
    pub fn run(&self) -> Result<StopReason> {
        info!("initializing OCR engine (slow on first run)");
        let recognizer = TextRecognizer::new(self.tessdata_dir.as_deref(), &self.language)?;

        let regions = region::load_regions(&self.regions_file)?;
        if regions.is_empty() {
            warn!(
                "{} defines no regions; rows will carry only timestamps",
                self.regions_file.display()
            );
        }

        let mut capturer = ScreenCapturer::primary()?;
        let log = ReadingsLog::new(&self.log_file);
        let flag = StopFlag::new(&self.stop_flag_file);

        info!(
            "capturing {} region(s) every {:?}, logging to {}",
            regions.len(),
            self.interval,
            self.log_file.display()
        );
        self.run_loop(&regions, &mut capturer, &recognizer, &log, &flag)
    }

    fn run_loop(
        &self,
        regions: &[Region],
        source: &mut dyn FrameSource,
        recognizer: &dyn Recognizer,
        log: &ReadingsLog,
        flag: &StopFlag,
    ) -> Result<StopReason> {
        loop {
            if self.interrupt_requested() {
                info!("interrupt received, stopping capture");
                return Ok(StopReason::Interrupted);
            }
            if flag.consume()? {
                info!("stop flag honored, stopping capture");
                return Ok(StopReason::FlagHonored);
            }

            let mut texts = Vec::with_capacity(regions.len());
            for region in regions {
                let frame = source.capture(region)?;
                let fragments = recognizer.recognize(&frame)?;
                texts.push(ocr::assemble(&fragments));
            }
            log.append(&ReadingRecord { texts })?;
            debug!("appended record for {} region(s)", regions.len());

            thread::sleep(self.interval);
        }
    }

    fn interrupt_requested(&self) -> bool {
        self.interrupted
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::ocr::Fragment;
    use image::RgbaImage;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;

    /// Produces blank frames; raises the shared interrupt flag after a set
    /// number of captures so tests can bound the number of cycles.
    struct StubSource {
        captures: usize,
        interrupt_after: usize,
        interrupted: Arc<AtomicBool>,
    }

    impl StubSource {
        fn new(interrupt_after: usize, interrupted: Arc<AtomicBool>) -> Self {
            StubSource {
                captures: 0,
                interrupt_after,
                interrupted,
            }
        }
    }

    impl FrameSource for StubSource {
        fn capture(&mut self, _region: &Region) -> Result<RgbaImage> {
            self.captures += 1;
            if self.captures >= self.interrupt_after {
                self.interrupted.store(true, Ordering::SeqCst);
            }
            Ok(RgbaImage::new(8, 8))
        }
    }

    struct FailingSource;

    impl FrameSource for FailingSource {
        fn capture(&mut self, _region: &Region) -> Result<RgbaImage> {
            Err(Error::capture("display went away"))
        }
    }

    /// Replays a fixed sequence of recognition results, then empties.
    struct ScriptedRecognizer {
        outputs: RefCell<VecDeque<Vec<Fragment>>>,
    }

    impl ScriptedRecognizer {
        fn new(outputs: Vec<Vec<&str>>) -> Self {
            let outputs = outputs
                .into_iter()
                .map(|texts| {
                    texts
                        .into_iter()
                        .map(|text| Fragment {
                            left: 0,
                            top: 0,
                            width: 10,
                            height: 10,
                            text: text.into(),
                            confidence: 95.0,
                        })
                        .collect()
                })
                .collect();
            ScriptedRecognizer {
                outputs: RefCell::new(outputs),
            }
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn recognize(&self, _frame: &RgbaImage) -> Result<Vec<Fragment>> {
            Ok(self.outputs.borrow_mut().pop_front().unwrap_or_default())
        }
    }

    fn two_regions() -> Vec<Region> {
        vec![
            Region {
                top: 100,
                left: 50,
                width: 200,
                height: 100,
            },
            Region {
                top: 300,
                left: 50,
                width: 200,
                height: 100,
            },
        ]
    }

    fn loop_with(dir: &Path, interrupted: Arc<AtomicBool>) -> CaptureLoop {
        let mut capture_loop = CaptureLoop::new();
        capture_loop
            .set_interval(Duration::ZERO)
            .set_log_file(dir.join("readings.csv"))
            .set_stop_flag_file(dir.join("stop_logging.txt"))
            .set_interrupt_flag(interrupted);
        capture_loop
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn one_cycle_yields_one_row_with_one_field_per_region() {
        let dir = tempfile::tempdir().unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let capture_loop = loop_with(dir.path(), interrupted.clone());

        let regions = two_regions();
        // interrupt after one full cycle (2 captures)
        let mut source = StubSource::new(2, interrupted);
        let recognizer = ScriptedRecognizer::new(vec![vec!["12.5"], vec!["3.1", "kg"]]);
        let log = ReadingsLog::new(dir.path().join("readings.csv"));
        let flag = StopFlag::new(dir.path().join("stop_logging.txt"));

        let reason = capture_loop
            .run_loop(&regions, &mut source, &recognizer, &log, &flag)
            .unwrap();
        assert_eq!(reason, StopReason::Interrupted);

        let rows = read_rows(log.path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["Timestamp", "ROI 1 Text", "ROI 2 Text"]);
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1][1], "12.5");
        assert_eq!(rows[1][2], "3.1 kg");
    }

    #[test]
    fn stop_flag_is_honored_before_any_cycle_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let capture_loop = loop_with(dir.path(), interrupted.clone());

        let flag_path = dir.path().join("stop_logging.txt");
        fs::write(&flag_path, "stop").unwrap();

        let regions = two_regions();
        let mut source = StubSource::new(usize::MAX, interrupted);
        let recognizer = ScriptedRecognizer::new(vec![]);
        let log = ReadingsLog::new(dir.path().join("readings.csv"));
        let flag = StopFlag::new(&flag_path);

        let reason = capture_loop
            .run_loop(&regions, &mut source, &recognizer, &log, &flag)
            .unwrap();

        assert_eq!(reason, StopReason::FlagHonored);
        assert!(!flag_path.exists(), "flag must be deleted once honored");
        assert!(!log.path().exists(), "no partial record may be emitted");
    }

    #[test]
    fn pause_content_is_ignored_and_the_loop_keeps_cycling() {
        let dir = tempfile::tempdir().unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let capture_loop = loop_with(dir.path(), interrupted.clone());

        let flag_path = dir.path().join("stop_logging.txt");
        fs::write(&flag_path, "pause").unwrap();

        let regions = two_regions();
        let mut source = StubSource::new(2, interrupted);
        let recognizer = ScriptedRecognizer::new(vec![vec!["ok"]]);
        let log = ReadingsLog::new(dir.path().join("readings.csv"));
        let flag = StopFlag::new(&flag_path);

        let reason = capture_loop
            .run_loop(&regions, &mut source, &recognizer, &log, &flag)
            .unwrap();

        assert_eq!(reason, StopReason::Interrupted);
        assert!(flag_path.exists(), "non-stop content must be left in place");
        let rows = read_rows(log.path());
        assert_eq!(rows.len(), 2, "the loop must have completed a cycle");
    }

    #[test]
    fn empty_recognition_results_still_fill_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let capture_loop = loop_with(dir.path(), interrupted.clone());

        let regions = two_regions();
        let mut source = StubSource::new(2, interrupted);
        // recognizer finds nothing anywhere
        let recognizer = ScriptedRecognizer::new(vec![]);
        let log = ReadingsLog::new(dir.path().join("readings.csv"));
        let flag = StopFlag::new(dir.path().join("stop_logging.txt"));

        capture_loop
            .run_loop(&regions, &mut source, &recognizer, &log, &flag)
            .unwrap();

        let rows = read_rows(log.path());
        assert_eq!(rows[1].len(), 3);
        assert_eq!(rows[1][1], "");
        assert_eq!(rows[1][2], "");
    }

    #[test]
    fn capture_failure_propagates_with_its_kind() {
        let dir = tempfile::tempdir().unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let capture_loop = loop_with(dir.path(), interrupted);

        let regions = two_regions();
        let mut source = FailingSource;
        let recognizer = ScriptedRecognizer::new(vec![]);
        let log = ReadingsLog::new(dir.path().join("readings.csv"));
        let flag = StopFlag::new(dir.path().join("stop_logging.txt"));

        let err = capture_loop
            .run_loop(&regions, &mut source, &recognizer, &log, &flag)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Capture);
        assert!(!log.path().exists(), "no partial record may be emitted");
    }

    #[test]
    fn rows_accumulate_across_cycles_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        let capture_loop = loop_with(dir.path(), interrupted.clone());

        let regions = two_regions();
        // three full cycles before the interrupt lands
        let mut source = StubSource::new(6, interrupted);
        let recognizer = ScriptedRecognizer::new(vec![
            vec!["a"],
            vec!["b"],
            vec!["c"],
            vec!["d"],
            vec!["e"],
            vec!["f"],
        ]);
        let log = ReadingsLog::new(dir.path().join("readings.csv"));
        let flag = StopFlag::new(dir.path().join("stop_logging.txt"));

        capture_loop
            .run_loop(&regions, &mut source, &recognizer, &log, &flag)
            .unwrap();

        let rows = read_rows(log.path());
        assert_eq!(rows.len(), 4);
        let headers = rows.iter().filter(|r| r[0] == "Timestamp").count();
        assert_eq!(headers, 1);
        assert_eq!(rows[3][1], "e");
        assert_eq!(rows[3][2], "f");
    }
}
