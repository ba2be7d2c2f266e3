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

//! Declare captures for a test and assert on what was logged.

use std::fmt;

use crate::Backend;
use crate::CaptureRegistry;
use crate::Error;
use crate::Level;
use crate::LogEvent;
use crate::LoggerIdentity;

/// Reports a failed assertion to the test harness.
pub trait Reporter: fmt::Debug + Send + Sync + 'static {
    /// Fail the running test with the given message.
    fn fail(&self, message: &str) -> !;
}

impl<T: Reporter> From<T> for Box<dyn Reporter> {
    fn from(value: T) -> Self {
        Box::new(value)
    }
}

/// A reporter that panics, failing the enclosing `#[test]`.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct PanicReporter {}

impl Reporter for PanicReporter {
    fn fail(&self, message: &str) -> ! {
        panic!("{message}")
    }
}

/// A builder to declare which loggers a test captures.
///
/// # Examples
///
/// ```
/// use logcapture::LogCapturer;
/// use logcapture::bridge::log::LogBackend;
///
/// let capture = LogCapturer::new(LogBackend::new())
///     .capture_for_logger("checkout")
///     .unwrap()
///     .start()
///     .unwrap();
///
/// log::info!(target: "checkout", "order {} placed", 42);
/// capture.assert_contains("order 42 placed");
/// ```
#[derive(Debug)]
pub struct LogCapturer<B> {
    backend: B,
    registry: CaptureRegistry,
    level: Level,
    reporter: Box<dyn Reporter>,
}

impl<B: Backend> LogCapturer<B> {
    /// Create a builder capturing nothing yet.
    pub fn new(backend: B) -> Self {
        LogCapturer {
            backend,
            registry: CaptureRegistry::new(),
            level: Level::Info,
            reporter: Box::new(PanicReporter::default()),
        }
    }

    /// Set the level for captures declared afterwards without an explicit level.
    ///
    /// Default to [`Level::Info`].
    pub fn for_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the reporter for failed assertions.
    ///
    /// Default to [`PanicReporter`].
    pub fn with_reporter(mut self, reporter: impl Into<Box<dyn Reporter>>) -> Self {
        self.reporter = reporter.into();
        self
    }

    /// Capture the logger of type `T` at the default level.
    ///
    /// See [`LoggerIdentity::of`] for how the logger name is resolved.
    ///
    /// # Errors
    ///
    /// Return a config error if the logger is already captured.
    pub fn capture_for_type<T: ?Sized>(self) -> Result<Self, Error> {
        let level = self.level;
        self.capture_for_type_at::<T>(level)
    }

    /// Capture the logger of type `T` at the given level.
    ///
    /// # Errors
    ///
    /// Return a config error if the logger is already captured.
    pub fn capture_for_type_at<T: ?Sized>(self, level: Level) -> Result<Self, Error> {
        self.declare(LoggerIdentity::of::<T>(), level)
    }

    /// Capture the logger with the given name at the default level.
    ///
    /// # Errors
    ///
    /// Return a config error if the logger is already captured.
    pub fn capture_for_logger(self, name: impl Into<String>) -> Result<Self, Error> {
        let level = self.level;
        self.capture_for_logger_at(name, level)
    }

    /// Capture the logger with the given name at the given level.
    ///
    /// # Errors
    ///
    /// Return a config error if the logger is already captured.
    pub fn capture_for_logger_at(
        self,
        name: impl Into<String>,
        level: Level,
    ) -> Result<Self, Error> {
        self.declare(LoggerIdentity::named(name), level)
    }

    fn declare(mut self, identity: LoggerIdentity, level: Level) -> Result<Self, Error> {
        self.registry.declare(identity, level)?;
        Ok(self)
    }

    /// The captures declared so far.
    pub fn registry(&self) -> &CaptureRegistry {
        &self.registry
    }

    /// Attach the backend and start capturing.
    ///
    /// # Errors
    ///
    /// Return the attach error. Whatever was attached before the failure is detached again.
    pub fn start(self) -> Result<Capture<B>, Error> {
        let LogCapturer {
            mut backend,
            registry,
            reporter,
            ..
        } = self;

        if let Err(err) = backend.attach(&registry) {
            backend.detach();
            return Err(err);
        }

        Ok(Capture {
            backend,
            registry,
            reporter,
        })
    }
}

/// A running capture.
///
/// Dropping the capture detaches it, also when the test panics.
#[derive(Debug)]
pub struct Capture<B: Backend> {
    backend: B,
    registry: CaptureRegistry,
    reporter: Box<dyn Reporter>,
}

impl<B: Backend> Capture<B> {
    /// Return the first captured event matching the predicate.
    ///
    /// Fails the test if no event matches.
    pub fn assert_first_matching<P>(&self, mut predicate: P, description: &str) -> LogEvent
    where
        P: FnMut(&LogEvent) -> bool,
    {
        let events = self.backend.events();
        let count = events.len();
        match events.into_iter().find(|event| predicate(event)) {
            Some(event) => event,
            None => self.reporter.fail(&format!(
                "{}None of the {count} captured log events matched the filter predicate",
                prefix(description)
            )),
        }
    }

    /// Fail the test if any captured event matches the predicate.
    pub fn assert_none_match<P>(&self, mut predicate: P, description: &str)
    where
        P: FnMut(&LogEvent) -> bool,
    {
        let events = self.backend.events();
        if let Some(event) = events.iter().find(|event| predicate(*event)) {
            self.reporter.fail(&format!(
                "{}Expected not to find any predicate match but found one in log event <{event}>",
                prefix(description)
            ));
        }
    }

    /// Return the first captured event whose message contains `text`.
    ///
    /// The match is case-sensitive. Fails the test if no message contains it.
    pub fn assert_contains(&self, text: &str) -> LogEvent {
        self.assert_first_matching(
            |event| event.message().contains(text),
            &format!("Contain the string <{text}>"),
        )
    }

    /// Fail the test if any captured message contains `text`.
    pub fn assert_does_not_contain(&self, text: &str) {
        self.assert_none_match(
            |event| event.message().contains(text),
            &format!("Not contain the string <{text}>"),
        );
    }

    /// The events captured so far, in emission order.
    pub fn events(&self) -> Vec<LogEvent> {
        self.backend.events()
    }

    /// The number of events captured so far.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Whether no event was captured so far.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The captures this test declared.
    pub fn registry(&self) -> &CaptureRegistry {
        &self.registry
    }

    /// The attached backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Detach now and return everything captured.
    pub fn stop(mut self) -> Vec<LogEvent> {
        self.backend.detach();
        self.backend.events()
    }
}

impl<B: Backend> Drop for Capture<B> {
    fn drop(&mut self) {
        self.backend.detach();
    }
}

fn prefix(description: &str) -> String {
    if description.trim().is_empty() {
        String::new()
    } else {
        format!("{description} ==> ")
    }
}
