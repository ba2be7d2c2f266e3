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

use std::fmt::Write;

use jiff::Timestamp;
use jiff::tz::TimeZone;

use crate::LogEvent;

/// A layout that formats a captured event as plain text.
///
/// Output format:
///
/// ```text
/// 2024-08-11T22:44:57.172105+08:00 ERROR my_crate::db [main] src/db.rs:51 pool exhausted size=8
/// 2024-08-11T22:44:57.172219+08:00  WARN my_crate::db [worker-1] src/db.rs:52 slow query
/// ```
///
/// # Examples
///
/// ```
/// use jiff::tz::TimeZone;
/// use logcapture::layout::PlainTextLayout;
///
/// let layout = PlainTextLayout::default().timezone(TimeZone::UTC);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlainTextLayout {
    tz: Option<TimeZone>,
}

impl PlainTextLayout {
    /// Set the timezone for timestamps.
    ///
    /// Default to the system timezone.
    pub fn timezone(mut self, tz: TimeZone) -> Self {
        self.tz = Some(tz);
        self
    }

    /// Format one event as a single line, without a trailing newline.
    pub fn format(&self, event: &LogEvent) -> String {
        let mut text = String::new();

        // SAFETY: write to a string always succeeds
        match Timestamp::try_from(event.time()) {
            Ok(ts) => {
                let tz = self.tz.clone().unwrap_or_else(TimeZone::system);
                let time = ts.to_zoned(tz).strftime("%Y-%m-%dT%H:%M:%S.%6f%:z");
                write!(&mut text, "{time}").unwrap();
            }
            Err(_) => text.push('-'),
        }

        let level = event.level();
        let logger = event.logger_name();
        let thread = event.thread_name();
        write!(&mut text, " {level:>5} {logger} [{thread}]").unwrap();
        if let Some(file) = event.file() {
            let line = event.line().unwrap_or_default();
            write!(&mut text, " {file}:{line}").unwrap();
        }
        write!(&mut text, " {}", event.message()).unwrap();

        if let Some(marker) = event.marker() {
            write!(&mut text, " #{marker}").unwrap();
        }
        for (key, value) in event.key_values() {
            write!(&mut text, " {key}={value}").unwrap();
        }
        if let Some(error) = event.error() {
            write!(&mut text, " error=\"{error}\"").unwrap();
        }

        text
    }
}
