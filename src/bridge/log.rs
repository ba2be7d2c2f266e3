// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Capture records of the [`log`] crate.
//!
//! The bridge installs itself as the global [`log::Log`] on the first attach. Each record is
//! filtered at the effective level of its target in [`context`], then copied into every capture
//! attached along the target's lineage.

use std::sync::LazyLock;
use std::sync::OnceLock;

use log::LevelFilter;
use log::kv::Key;
use log::kv::Value;
use log::kv::VisitSource;

use crate::Adapter;
use crate::Bridge;
use crate::Error;
use crate::ErrorInfo;
use crate::Hierarchy;
use crate::Level;
use crate::LevelMapper;
use crate::LogCapturer;
use crate::LogEvent;
use crate::sink::Sink;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// Maps [`Level`] to [`log::LevelFilter`].
///
/// | neutral | `log` |
/// |---------|-------|
/// | TRACE   | Trace |
/// | DEBUG   | Debug |
/// | INFO    | Info  |
/// | WARN    | Warn  |
/// | ERROR   | Error |
///
/// `Off` has no neutral counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLevelMapper;

impl LevelMapper for LogLevelMapper {
    type Native = LevelFilter;

    fn to_native(level: Level) -> LevelFilter {
        match level {
            Level::Trace => LevelFilter::Trace,
            Level::Debug => LevelFilter::Debug,
            Level::Info => LevelFilter::Info,
            Level::Warn => LevelFilter::Warn,
            Level::Error => LevelFilter::Error,
        }
    }

    fn to_neutral(native: LevelFilter) -> Result<Level, Error> {
        match native {
            LevelFilter::Trace => Ok(Level::Trace),
            LevelFilter::Debug => Ok(Level::Debug),
            LevelFilter::Info => Ok(Level::Info),
            LevelFilter::Warn => Ok(Level::Warn),
            LevelFilter::Error => Ok(Level::Error),
            LevelFilter::Off => {
                Err(Error::mapping("cannot map level").with_context("level", native))
            }
        }
    }
}

static CONTEXT: LazyLock<Hierarchy<LevelFilter, Sink>> =
    LazyLock::new(|| Hierarchy::new(LevelFilter::Info));

/// The logger hierarchy `log` records are routed through.
///
/// Logger names are record targets, which default to the module path of the call site.
pub fn context() -> &'static Hierarchy<LevelFilter, Sink> {
    &CONTEXT
}

struct LogContext(());

impl log::Log for LogContext {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= CONTEXT.effective_level(metadata.target())
    }

    fn log(&self, record: &log::Record) {
        // the log macros skip `enabled`
        if !self.enabled(record.metadata()) {
            return;
        }

        let sinks = CONTEXT.appenders(record.target());
        if sinks.is_empty() {
            return;
        }

        match to_event(record) {
            Ok(event) => {
                for sink in sinks {
                    sink.append(event.clone());
                }
            }
            Err(err) => DefaultTrap::default().trap(&err),
        }
    }

    fn flush(&self) {}
}

fn to_event(record: &log::Record) -> Result<LogEvent, Error> {
    let level = LogLevelMapper::to_neutral(record.level().to_level_filter())?;

    let mut visitor = KvCollector::default();
    record.key_values().visit(&mut visitor).map_err(|err| {
        Error::backend("failed to visit key-values")
            .with_context("logger", record.target())
            .with_context("cause", err)
    })?;

    Ok(LogEvent::builder()
        .level(level)
        .logger_name(record.target())
        .module_path(record.module_path())
        .file(record.file())
        .line(record.line())
        .args(record.args())
        .key_values(visitor.key_values)
        .error(visitor.error)
        .build())
}

#[derive(Default)]
struct KvCollector {
    key_values: Vec<(String, String)>,
    error: Option<ErrorInfo>,
}

impl<'kvs> VisitSource<'kvs> for KvCollector {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), log::kv::Error> {
        if self.error.is_none() {
            if let Some(err) = value.to_borrowed_error() {
                self.error = Some(ErrorInfo::from_error(err));
            }
        }
        self.key_values.push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/// Install the bridge as the global `log` logger.
///
/// The global maximum level is raised to `Trace`; filtering happens per logger in [`context`].
/// Calling it again is a no-op.
///
/// # Errors
///
/// Return a backend error if another global logger was installed before.
pub fn init() -> Result<(), Error> {
    static LOGGER: LogContext = LogContext(());
    static INSTALLED: OnceLock<bool> = OnceLock::new();

    let installed = *INSTALLED.get_or_init(|| log::set_logger(&LOGGER).is_ok());
    if !installed {
        return Err(Error::backend(
            "another global logger is already installed for the log crate",
        ));
    }

    log::set_max_level(LevelFilter::Trace);
    Ok(())
}

/// The [`Bridge`] for the `log` crate.
#[derive(Debug)]
pub struct LogBridge;

impl Bridge for LogBridge {
    type Mapper = LogLevelMapper;

    fn context() -> &'static Hierarchy<LevelFilter, Sink> {
        context()
    }

    fn install() -> Result<(), Error> {
        init()
    }
}

/// A capture backend for the `log` crate.
pub type LogBackend = Adapter<LogBridge>;

/// A [`LogCapturer`] on a fresh [`LogBackend`].
pub fn capturer() -> LogCapturer<LogBackend> {
    LogCapturer::new(LogBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn every_level_round_trips() {
        for level in Level::ALL {
            let native = LogLevelMapper::to_native(level);
            assert_eq!(LogLevelMapper::to_neutral(native).unwrap(), level);
        }
        assert_eq!(LogLevelMapper::to_native(Level::Warn), LevelFilter::Warn);
    }

    #[test]
    fn off_has_no_neutral_level() {
        let err = LogLevelMapper::to_neutral(LevelFilter::Off).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        assert_eq!(err.context("level"), Some("OFF"));
    }

    #[test]
    fn record_is_copied() {
        let kvs = [("user", "alice"), ("attempt", "3")];
        let event = to_event(
            &log::Record::builder()
                .level(log::Level::Warn)
                .target("bridge::log::copy")
                .module_path_static(Some("bridge::log"))
                .file_static(Some("src/copy.rs"))
                .line(Some(7))
                .args(format_args!("plain"))
                .key_values(&kvs)
                .build(),
        )
        .unwrap();
        assert_eq!(event.level(), Level::Warn);
        assert_eq!(event.logger_name(), "bridge::log::copy");
        assert_eq!(event.module_path(), Some("bridge::log"));
        assert_eq!(event.file(), Some("src/copy.rs"));
        assert_eq!(event.line(), Some(7));
        assert_eq!(event.message(), "plain");
        assert_eq!(event.raw_message(), Some("plain"));
        assert_eq!(event.key_value("user"), Some("alice"));
        assert_eq!(event.key_value("attempt"), Some("3"));
        assert_eq!(event.marker(), None);
        assert_eq!(event.error(), None);
    }
}
