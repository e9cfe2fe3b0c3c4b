//! Session recorder - uncapped text mirror of an automated run
//!
//! One file per run, created lazily and never truncated. Every line is
//! flushed as soon as it is written.

use bevy::prelude::*;
use chrono::NaiveDateTime;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::constants::RESULTS_FILE_PREFIX;

/// What `open_for_run` did
#[derive(Debug, Clone, PartialEq)]
pub enum OpenOutcome {
    Created(PathBuf),
    /// A file is already open for this run, or the path already exists
    AlreadyStarted,
}

/// File name for a run started at `now`: `TestResults 19.10.2026 - 9.05.07.txt`
pub fn results_file_name(now: NaiveDateTime) -> String {
    format!(
        "{} {}.txt",
        RESULTS_FILE_PREFIX,
        now.format("%d.%m.%Y - %-H.%M.%S")
    )
}

#[derive(Debug, Default)]
pub struct SessionRecorder {
    file: Option<File>,
    path: Option<PathBuf>,
    lines_written: usize,
}

impl SessionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the run file. Never overwrites an existing file.
    pub fn open_for_run(&mut self, path: impl AsRef<Path>) -> io::Result<OpenOutcome> {
        if self.file.is_some() {
            return Ok(OpenOutcome::AlreadyStarted);
        }

        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().append(true).create_new(true).open(path) {
            Ok(file) => {
                info!("Recording test results to {}", path.display());
                self.file = Some(file);
                self.path = Some(path.to_path_buf());
                self.lines_written = 0;
                Ok(OpenOutcome::Created(path.to_path_buf()))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("{} already exists, run already started", path.display());
                Ok(OpenOutcome::AlreadyStarted)
            }
            Err(e) => Err(e),
        }
    }

    /// Append one line and flush it
    pub fn write_line(&mut self, line: &str) {
        let Some(file) = &mut self.file else {
            return;
        };

        if let Err(e) = writeln!(file, "{}", line).and_then(|_| file.flush()) {
            warn!("Failed to write test result line: {}", e);
            return;
        }
        self.lines_written += 1;
    }

    /// Flush and release the file
    pub fn close(&mut self) {
        if let Some(mut file) = self.file.take()
            && let Err(e) = file.flush()
        {
            warn!("Failed to flush test results: {}", e);
        }
    }

    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lines_written(&self) -> usize {
        self.lines_written
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("patchcheck_{}", Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_results_file_name() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(results_file_name(now), "TestResults 19.10.2026 - 9.05.07.txt");

        let evening = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(21, 30, 0)
            .unwrap();
        assert_eq!(results_file_name(evening), "TestResults 02.01.2026 - 21.30.00.txt");
    }

    #[test]
    fn test_write_lines_flushed() {
        let path = temp_path("run.txt");
        let mut recorder = SessionRecorder::new();
        assert_eq!(
            recorder.open_for_run(&path).unwrap(),
            OpenOutcome::Created(path.clone())
        );

        recorder.write_line("Sent triggerIn: bang");
        recorder.write_line("messageOut: test 1;");

        // Readable before close
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Sent triggerIn: bang\nmessageOut: test 1;\n");
        assert_eq!(recorder.lines_written(), 2);
    }

    #[test]
    fn test_second_open_is_noop() {
        let path = temp_path("run1.txt");
        let mut recorder = SessionRecorder::new();
        recorder.open_for_run(&path).unwrap();
        recorder.write_line("first");

        assert_eq!(
            recorder.open_for_run(&path).unwrap(),
            OpenOutcome::AlreadyStarted
        );
        recorder.write_line("second");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_existing_file_not_truncated() {
        let path = temp_path("run1.txt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "earlier run\n").unwrap();

        let mut recorder = SessionRecorder::new();
        assert_eq!(
            recorder.open_for_run(&path).unwrap(),
            OpenOutcome::AlreadyStarted
        );
        assert!(!recorder.is_active());
        recorder.write_line("dropped");

        assert_eq!(fs::read_to_string(&path).unwrap(), "earlier run\n");
    }

    #[test]
    fn test_inactive_recorder_ignores_writes() {
        let mut recorder = SessionRecorder::new();
        recorder.write_line("nothing");
        assert_eq!(recorder.lines_written(), 0);
        assert!(recorder.path().is_none());
    }
}
