use std::cell::RefCell;

use log::{Level, Log, Metadata, Record, SetLoggerError};
use serde_json::json;

use crate::diagnostics::logger::{DiagnosticLog, DIAGNOSTICS_TARGET};

thread_local! {
    static FORWARD_TO: RefCell<Option<DiagnosticLog>> = RefCell::new(None);
}

static LOGGER: SiteLogger = SiteLogger;

/// Prints through `console_log` and copies warnings and errors into the
/// diagnostic log once [`forward_to`] has been given one.
struct SiteLogger;

impl Log for SiteLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        #[cfg(target_arch = "wasm32")]
        console_log::log(record);

        if record.level() <= Level::Warn && record.target() != DIAGNOSTICS_TARGET {
            forward(record);
        }
    }

    fn flush(&self) {}
}

fn forward(record: &Record) {
    FORWARD_TO.with(|slot| {
        // Busy while a forwarded record is being written; anything logged
        // from inside that write is only printed.
        let Ok(slot) = slot.try_borrow_mut() else {
            return;
        };
        if let Some(diagnostics) = slot.as_ref() {
            diagnostics.capture(
                record.level().into(),
                &record.args().to_string(),
                json!({ "target": record.target() }),
            );
        }
    });
}

/// Installs the site logger with `level` as the maximum.
pub fn init(level: Level) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level.to_level_filter());
    Ok(())
}

/// Starts (or with `None`, stops) copying warnings and errors into
/// `diagnostics`.
pub fn forward_to(diagnostics: Option<DiagnosticLog>) {
    FORWARD_TO.with(|slot| *slot.borrow_mut() = diagnostics);
}
