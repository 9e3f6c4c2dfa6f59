//! Shared test helpers
//!
//! A process-wide `log` sink that records every message with the thread
//! that emitted it, so a test can assert on its own warnings while the
//! harness runs other tests in parallel.

#![cfg(test)]

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push((
            thread::current().id(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

fn take_for_current_thread() -> Vec<(Level, String)> {
    let id = thread::current().id();
    let mut records = LOGGER.records.lock().unwrap_or_else(|e| e.into_inner());
    let (mine, rest): (Vec<_>, Vec<_>) = records.drain(..).partition(|(t, _, _)| *t == id);
    *records = rest;
    mine.into_iter().map(|(_, level, msg)| (level, msg)).collect()
}

/// Run `f` and return its result with the warnings it logged on this thread.
pub fn warnings_during<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger in unit tests");
        log::set_max_level(LevelFilter::Trace);
    });
    take_for_current_thread();
    let result = f();
    let warnings = take_for_current_thread()
        .into_iter()
        .filter(|(level, _)| *level == Level::Warn)
        .map(|(_, msg)| msg)
        .collect();
    (result, warnings)
}

#[test]
fn test_captures_only_own_thread() {
    let ((), warnings) = warnings_during(|| {
        log::warn!("first");
        log::info!("not a warning");
        thread::spawn(|| log::warn!("elsewhere"))
            .join()
            .unwrap();
        log::warn!("second");
    });
    assert_eq!(warnings, vec!["first".to_string(), "second".to_string()]);
}
