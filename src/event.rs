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

//! Captured log events.

use std::fmt;
use std::thread;
use std::time::SystemTime;

use crate::Level;

/// An owned, backend-independent snapshot of one emitted log record.
///
/// All values are copied out of the native record while it is being dispatched, so an event
/// never refers back to backend-owned memory.
#[derive(Clone, Debug)]
pub struct LogEvent {
    // the observed time
    time: SystemTime,

    // the metadata
    level: Level,
    logger_name: String,
    thread_name: String,
    module_path: Option<String>,
    file: Option<String>,
    line: Option<u32>,

    // the payload
    message: String,
    raw_message: Option<String>,

    // structural logging
    key_values: Vec<(String, String)>,
    marker: Option<String>,
    error: Option<ErrorInfo>,
}

impl LogEvent {
    /// The time the event was captured.
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// The neutral severity of the event.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The name of the logger the event was emitted to.
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    /// The name of the thread that emitted the event.
    ///
    /// Unnamed threads are reported by their [`ThreadId`](std::thread::ThreadId).
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// The module path of the log call site.
    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    /// The source file containing the log call site.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// The line containing the log call site.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// The formatted message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The literal message template, if the backend exposes one.
    ///
    /// Only present when the message was a literal without interpolated arguments.
    pub fn raw_message(&self) -> Option<&str> {
        self.raw_message.as_deref()
    }

    /// The structured key-values, in emission order.
    pub fn key_values(&self) -> &[(String, String)] {
        &self.key_values
    }

    /// Look up the first key-value with the given key.
    pub fn key_value(&self, key: &str) -> Option<&str> {
        self.key_values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The marker of the event, for backends that support markers.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// The error attached to the event, if any.
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    /// Returns a new builder.
    pub fn builder() -> LogEventBuilder {
        LogEventBuilder::default()
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "logger_name={}, level={}, message={}",
            self.logger_name, self.level, self.message
        )
    }
}

/// A structured copy of an error value attached to a log event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorInfo {
    message: String,
    sources: Vec<String>,
}

impl ErrorInfo {
    /// Copy an error and its whole `source()` chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut sources = vec![];
        let mut source = err.source();
        while let Some(err) = source {
            sources.push(err.to_string());
            source = err.source();
        }

        ErrorInfo {
            message: err.to_string(),
            sources,
        }
    }

    /// The display string of the error.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The display strings of the error's sources, outermost first.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        for source in &self.sources {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

/// Builder for [`LogEvent`].
#[derive(Debug)]
pub struct LogEventBuilder {
    event: LogEvent,
}

impl Default for LogEventBuilder {
    fn default() -> Self {
        LogEventBuilder {
            event: LogEvent {
                time: SystemTime::now(),
                level: Level::Info,
                logger_name: String::new(),
                thread_name: current_thread_name(),
                module_path: None,
                file: None,
                line: None,
                message: String::new(),
                raw_message: None,
                key_values: vec![],
                marker: None,
                error: None,
            },
        }
    }
}

impl LogEventBuilder {
    /// Set [`time`](LogEvent::time).
    pub fn time(mut self, time: SystemTime) -> Self {
        self.event.time = time;
        self
    }

    /// Set [`level`](LogEvent::level).
    pub fn level(mut self, level: Level) -> Self {
        self.event.level = level;
        self
    }

    /// Set [`logger_name`](LogEvent::logger_name).
    pub fn logger_name(mut self, name: impl Into<String>) -> Self {
        self.event.logger_name = name.into();
        self
    }

    /// Set [`thread_name`](LogEvent::thread_name).
    ///
    /// Defaults to the name of the thread creating the builder.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.event.thread_name = name.into();
        self
    }

    /// Set [`module_path`](LogEvent::module_path).
    pub fn module_path(mut self, path: Option<&str>) -> Self {
        self.event.module_path = path.map(ToOwned::to_owned);
        self
    }

    /// Set [`file`](LogEvent::file).
    pub fn file(mut self, file: Option<&str>) -> Self {
        self.event.file = file.map(ToOwned::to_owned);
        self
    }

    /// Set [`line`](LogEvent::line).
    pub fn line(mut self, line: Option<u32>) -> Self {
        self.event.line = line;
        self
    }

    /// Set [`message`](LogEvent::message).
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.event.message = message.into();
        self
    }

    /// Set [`message`](LogEvent::message) and [`raw_message`](LogEvent::raw_message) from
    /// format arguments.
    pub fn args(mut self, args: &fmt::Arguments) -> Self {
        self.event.raw_message = args.as_str().map(ToOwned::to_owned);
        self.event.message = args.to_string();
        self
    }

    /// Append a key-value.
    pub fn key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.event.key_values.push((key.into(), value.into()));
        self
    }

    /// Set [`key_values`](LogEvent::key_values).
    pub fn key_values(mut self, kvs: Vec<(String, String)>) -> Self {
        self.event.key_values = kvs;
        self
    }

    /// Set [`marker`](LogEvent::marker).
    pub fn marker(mut self, marker: Option<String>) -> Self {
        self.event.marker = marker;
        self
    }

    /// Set [`error`](LogEvent::error).
    pub fn error(mut self, error: Option<ErrorInfo>) -> Self {
        self.event.error = error;
        self
    }

    /// Invoke the builder and return a `LogEvent`.
    pub fn build(self) -> LogEvent {
        self.event
    }
}

pub(crate) fn current_thread_name() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_owned(),
        None => format!("{:?}", current.id()),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[derive(Debug)]
    struct Wrapped(io::Error);

    impl fmt::Display for Wrapped {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failed to load config")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_info_copies_source_chain() {
        let err = Wrapped(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        let info = ErrorInfo::from_error(&err);
        assert_eq!(info.message(), "failed to load config");
        assert_eq!(info.sources(), ["no such file".to_string()]);
        assert_eq!(info.to_string(), "failed to load config: no such file");
    }

    #[test]
    fn args_keep_literal_template() {
        let event = LogEvent::builder()
            .args(&format_args!("plain literal"))
            .build();
        assert_eq!(event.message(), "plain literal");
        assert_eq!(event.raw_message(), Some("plain literal"));

        let n = 42;
        let event = LogEvent::builder().args(&format_args!("n={n}")).build();
        assert_eq!(event.message(), "n=42");
        assert_eq!(event.raw_message(), None);
    }

    #[test]
    fn builder_defaults_to_current_thread() {
        let event = thread::Builder::new()
            .name("event-builder".into())
            .spawn(|| LogEvent::builder().build())
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(event.thread_name(), "event-builder");
        assert_eq!(event.level(), Level::Info);
        assert!(event.key_values().is_empty());
        assert!(event.marker().is_none());
    }

    #[test]
    fn display_summarizes_event() {
        let event = LogEvent::builder()
            .logger_name("my_crate::db")
            .level(Level::Warn)
            .message("pool exhausted")
            .key_value("size", "8")
            .build();
        insta::assert_snapshot!(
            event.to_string(),
            @"logger_name=my_crate::db, level=WARN, message=pool exhausted"
        );
        assert_eq!(event.key_value("size"), Some("8"));
    }
}
