//! Process-wide `log` backend that keeps every record for assertions.
//!
//! The test harness runs tests on parallel threads that share the one
//! global logger, so records are tagged with the emitting thread and a
//! test only ever sees its own.

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

use log::{Level, LevelFilter, Log, Metadata, Record};

#[derive(Debug, Clone)]
pub struct Captured {
    pub level: Level,
    pub message: String,
}

struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, Captured)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let captured = Captured {
            level: record.level(),
            message: record.args().to_string(),
        };
        self.records
            .lock()
            .unwrap()
            .push((thread::current().id(), captured));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

/// Install the capture logger (once per process) and drop anything this
/// thread logged so far.
pub fn start() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("no other logger installed in tests");
        log::set_max_level(LevelFilter::Trace);
    });
    take();
}

/// Drain the records emitted by the calling thread.
pub fn take() -> Vec<Captured> {
    let me = thread::current().id();
    let mut records = LOGGER.records.lock().unwrap();
    let (mine, others): (Vec<_>, Vec<_>) = records.drain(..).partition(|(id, _)| *id == me);
    *records = others;
    mine.into_iter().map(|(_, c)| c).collect()
}
