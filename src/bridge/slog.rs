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

//! Capture records of the [`slog`] crate.
//!
//! `slog` has no global logger, so application loggers must be rooted on the [`drain`] of this
//! bridge for their records to be captured. The logger name of a record is its module.

use std::fmt;
use std::sync::LazyLock;

use slog::FilterLevel;
use slog::KV;
use slog::Never;
use slog::OwnedKVList;
use slog::Record;

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

/// Maps [`Level`] to [`slog::FilterLevel`].
///
/// | neutral | `slog`   |
/// |---------|----------|
/// | TRACE   | Trace    |
/// | DEBUG   | Debug    |
/// | INFO    | Info     |
/// | WARN    | Warning  |
/// | ERROR   | Error    |
///
/// `Critical` collapses to ERROR. `Off` has no neutral counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlogLevelMapper;

impl LevelMapper for SlogLevelMapper {
    type Native = FilterLevel;

    fn to_native(level: Level) -> FilterLevel {
        match level {
            Level::Trace => FilterLevel::Trace,
            Level::Debug => FilterLevel::Debug,
            Level::Info => FilterLevel::Info,
            Level::Warn => FilterLevel::Warning,
            Level::Error => FilterLevel::Error,
        }
    }

    fn to_neutral(native: FilterLevel) -> Result<Level, Error> {
        match native {
            FilterLevel::Trace => Ok(Level::Trace),
            FilterLevel::Debug => Ok(Level::Debug),
            FilterLevel::Info => Ok(Level::Info),
            FilterLevel::Warning => Ok(Level::Warn),
            FilterLevel::Error | FilterLevel::Critical => Ok(Level::Error),
            FilterLevel::Off => {
                Err(Error::mapping("cannot map level").with_context("level", "Off"))
            }
        }
    }
}

fn neutral_of(level: slog::Level) -> Level {
    match level {
        slog::Level::Trace => Level::Trace,
        slog::Level::Debug => Level::Debug,
        slog::Level::Info => Level::Info,
        slog::Level::Warning => Level::Warn,
        slog::Level::Error | slog::Level::Critical => Level::Error,
    }
}

// higher is more verbose; a record passes when its severity does not exceed the threshold
fn severity(level: slog::Level) -> u8 {
    match level {
        slog::Level::Critical => 1,
        slog::Level::Error => 2,
        slog::Level::Warning => 3,
        slog::Level::Info => 4,
        slog::Level::Debug => 5,
        slog::Level::Trace => 6,
    }
}

fn threshold(filter: FilterLevel) -> u8 {
    match filter {
        FilterLevel::Off => 0,
        FilterLevel::Critical => 1,
        FilterLevel::Error => 2,
        FilterLevel::Warning => 3,
        FilterLevel::Info => 4,
        FilterLevel::Debug => 5,
        FilterLevel::Trace => 6,
    }
}

static CONTEXT: LazyLock<Hierarchy<FilterLevel, Sink>> =
    LazyLock::new(|| Hierarchy::new(FilterLevel::Info));

/// The logger hierarchy `slog` records are routed through.
///
/// Logger names are record modules, the module path of the call site.
pub fn context() -> &'static Hierarchy<FilterLevel, Sink> {
    &CONTEXT
}

/// A drain that copies records into the captures attached in [`context`].
///
/// # Examples
///
/// ```
/// use slog::Drain;
///
/// let drain = logcapture::bridge::slog::drain().fuse();
/// let logger = slog::Logger::root(drain, slog::o!("service" => "checkout"));
/// slog::info!(logger, "ready");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextDrain;

impl slog::Drain for ContextDrain {
    type Ok = ();
    type Err = Never;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<(), Never> {
        let name = record.module();
        if severity(record.level()) > threshold(CONTEXT.effective_level(name)) {
            return Ok(());
        }

        let sinks = CONTEXT.appenders(name);
        if sinks.is_empty() {
            return Ok(());
        }

        match to_event(record, values) {
            Ok(event) => {
                for sink in sinks {
                    sink.append(event.clone());
                }
            }
            Err(err) => DefaultTrap::default().trap(&err),
        }
        Ok(())
    }
}

fn to_event(record: &Record<'_>, values: &OwnedKVList) -> Result<LogEvent, Error> {
    let mut collector = KvCollector::default();
    record
        .kv()
        .serialize(record, &mut collector)
        .and_then(|()| values.serialize(record, &mut collector))
        .map_err(|err| {
            Error::backend("failed to serialize key-values")
                .with_context("logger", record.module())
                .with_context("cause", format!("{err:?}"))
        })?;

    let marker = match record.tag() {
        "" => None,
        tag => Some(tag.to_owned()),
    };

    Ok(LogEvent::builder()
        .level(neutral_of(record.level()))
        .logger_name(record.module())
        .module_path(Some(record.module()))
        .file(Some(record.file()))
        .line(Some(record.line()))
        .args(record.msg())
        .key_values(collector.key_values)
        .marker(marker)
        .error(collector.error)
        .build())
}

#[derive(Default)]
struct KvCollector {
    key_values: Vec<(String, String)>,
    error: Option<ErrorInfo>,
}

impl slog::Serializer for KvCollector {
    fn emit_arguments(&mut self, key: slog::Key, val: &fmt::Arguments<'_>) -> slog::Result {
        self.key_values.push((key.to_string(), val.to_string()));
        Ok(())
    }

    fn emit_error(
        &mut self,
        key: slog::Key,
        error: &(dyn std::error::Error + 'static),
    ) -> slog::Result {
        if self.error.is_none() {
            self.error = Some(ErrorInfo::from_error(error));
        }
        self.key_values.push((key.to_string(), error.to_string()));
        Ok(())
    }
}

/// The drain application loggers must be rooted on to be captured.
pub fn drain() -> ContextDrain {
    ContextDrain
}

/// A root logger on [`drain`].
pub fn logger() -> slog::Logger {
    slog::Logger::root(ContextDrain, slog::o!())
}

/// The [`Bridge`] for the `slog` crate.
#[derive(Debug)]
pub struct SlogBridge;

impl Bridge for SlogBridge {
    type Mapper = SlogLevelMapper;

    fn context() -> &'static Hierarchy<FilterLevel, Sink> {
        context()
    }

    fn install() -> Result<(), Error> {
        Ok(())
    }
}

/// A capture backend for the `slog` crate.
pub type SlogBackend = Adapter<SlogBridge>;

/// A [`LogCapturer`] on a fresh [`SlogBackend`].
pub fn capturer() -> LogCapturer<SlogBackend> {
    LogCapturer::new(SlogBackend::new())
}
