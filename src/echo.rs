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

//! Echo captured events to the test output.

use std::borrow::Cow;

use crate::Error;
use crate::LogEvent;
use crate::layout::PlainTextLayout;

/// The default environment variable for the echo directives.
pub const DEFAULT_ECHO_ENV: &str = "LOGCAPTURE_ECHO";

/// Writes captured events to stderr in a way the test harness captures, so the output is
/// suppressed unless `--nocapture` or `--show-output` is specified.
///
/// Which events are echoed is controlled by [`env_filter`] directives, the same syntax
/// `env_logger` uses for `RUST_LOG`. For example, `warn,my_crate::db=trace`.
///
/// # Examples
///
/// ```
/// use logcapture::echo::Echo;
///
/// let echo = Echo::new("info,my_crate::db=trace");
/// ```
#[derive(Debug)]
pub struct Echo {
    filter: env_filter::Filter,
    layout: PlainTextLayout,
}

impl Echo {
    /// Create an echo from directives, ignoring malformed ones.
    pub fn new(directives: &str) -> Self {
        let mut builder = env_filter::Builder::new();
        builder.parse(directives);
        Echo {
            filter: builder.build(),
            layout: PlainTextLayout::default(),
        }
    }

    /// Create an echo from directives.
    ///
    /// # Errors
    ///
    /// Return a config error if the directives are malformed.
    pub fn try_new(directives: &str) -> Result<Self, Error> {
        let mut builder = env_filter::Builder::new();
        builder.try_parse(directives).map_err(|err| {
            Error::config("malformed echo directives")
                .with_context("directives", directives)
                .with_source(err)
        })?;
        Ok(Echo {
            filter: builder.build(),
            layout: PlainTextLayout::default(),
        })
    }

    /// Create an echo from the `LOGCAPTURE_ECHO` environment variable.
    ///
    /// Return `None` if the variable is not set.
    pub fn from_default_env() -> Option<Self> {
        Echo::from_env(DEFAULT_ECHO_ENV)
    }

    /// Create an echo from the given environment variable.
    ///
    /// Return `None` if the variable is not set.
    pub fn from_env<'a, E>(name: E) -> Option<Self>
    where
        E: Into<Cow<'a, str>>,
    {
        let name = name.into();
        std::env::var(&*name).ok().map(|s| Echo::new(&s))
    }

    /// Set the layout for the echoed lines.
    ///
    /// Default to [`PlainTextLayout`].
    pub fn with_layout(mut self, layout: PlainTextLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Whether the event passes the echo directives.
    pub fn enabled(&self, event: &LogEvent) -> bool {
        let metadata = log::MetadataBuilder::new()
            .level(event.level().to_log())
            .target(event.logger_name())
            .build();
        self.filter.enabled(&metadata)
    }

    pub(crate) fn write(&self, event: &LogEvent) {
        if self.enabled(event) {
            eprintln!("{}", self.layout.format(event));
        }
    }
}
