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

//! Capture events of the [`tracing`] crate.
//!
//! Events reach the bridge through a [`Layer`] with a per-layer filter, so capturing a logger
//! never changes what the other layers of the subscriber see. Use [`init`] to install a
//! subscriber made of that layer alone, or compose [`layer`] into your own subscriber.

use std::fmt;
use std::sync::LazyLock;
use std::sync::Once;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tracing::Event;
use tracing::Metadata;
use tracing::Subscriber;
use tracing::field::Field;
use tracing::field::Visit;
use tracing::level_filters::LevelFilter;
use tracing::subscriber::Interest;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::Filter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

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

/// Maps [`Level`] to `tracing`'s [`LevelFilter`].
///
/// `OFF` has no neutral counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLevelMapper;

impl LevelMapper for TracingLevelMapper {
    type Native = LevelFilter;

    fn to_native(level: Level) -> LevelFilter {
        match level {
            Level::Trace => LevelFilter::TRACE,
            Level::Debug => LevelFilter::DEBUG,
            Level::Info => LevelFilter::INFO,
            Level::Warn => LevelFilter::WARN,
            Level::Error => LevelFilter::ERROR,
        }
    }

    fn to_neutral(native: LevelFilter) -> Result<Level, Error> {
        match native.into_level() {
            Some(level) => Ok(neutral_of(level)),
            None => Err(Error::mapping("cannot map level").with_context("level", native)),
        }
    }
}

fn neutral_of(level: tracing::Level) -> Level {
    match level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        tracing::Level::DEBUG => Level::Debug,
        _ => Level::Trace,
    }
}

static CONTEXT: LazyLock<Hierarchy<LevelFilter, Sink>> =
    LazyLock::new(|| Hierarchy::new(LevelFilter::INFO));

// set once a capture layer is part of a subscriber
static IN_SUBSCRIBER: AtomicBool = AtomicBool::new(false);

/// The logger hierarchy `tracing` events are routed through.
///
/// Logger names are event targets, which default to the module path of the call site.
pub fn context() -> &'static Hierarchy<LevelFilter, Sink> {
    &CONTEXT
}

/// The layer that copies events into the captures attached in [`context`].
#[derive(Debug)]
pub struct CaptureLayer {
    mark: bool,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_layer(&mut self, _: &mut S) {
        if self.mark {
            IN_SUBSCRIBER.store(true, Ordering::Release);
        }
    }

    fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
        let metadata = event.metadata();
        let sinks = CONTEXT.appenders(metadata.target());
        if sinks.is_empty() {
            return;
        }

        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        let event = LogEvent::builder()
            .level(neutral_of(*metadata.level()))
            .logger_name(metadata.target())
            .module_path(metadata.module_path())
            .file(metadata.file())
            .line(metadata.line())
            .message(visitor.message.unwrap_or_default())
            .key_values(visitor.key_values)
            .error(visitor.error)
            .build();
        for sink in sinks {
            sink.append(event.clone());
        }
    }
}

/// Enables events at or above the effective level of their target in [`context`].
#[derive(Debug)]
pub struct ContextFilter {
    _private: (),
}

impl<S> Filter<S> for ContextFilter {
    fn enabled(&self, metadata: &Metadata<'_>, _: &Context<'_, S>) -> bool {
        metadata.is_event() && *metadata.level() <= CONTEXT.effective_level(metadata.target())
    }

    fn callsite_enabled(&self, _: &'static Metadata<'static>) -> Interest {
        // levels change at runtime
        Interest::sometimes()
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        Some(LevelFilter::TRACE)
    }
}

/// The capture layer with its filter, for composing into a subscriber.
///
/// # Examples
///
/// ```
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let subscriber = tracing_subscriber::registry().with(logcapture::bridge::tracing::layer());
/// tracing::subscriber::set_global_default(subscriber).unwrap();
/// ```
pub fn layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    capture_layer(true)
}

fn capture_layer<S>(mark: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    CaptureLayer { mark }.with_filter(ContextFilter { _private: () })
}

/// Install a subscriber made of the capture layer as the global default.
///
/// Calling it again is a no-op.
///
/// # Errors
///
/// Return a backend error if another global subscriber was installed before, unless that
/// subscriber contains a [`layer`].
pub fn init() -> Result<(), Error> {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let subscriber = tracing_subscriber::registry().with(capture_layer(false));
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            IN_SUBSCRIBER.store(true, Ordering::Release);
        }
    });

    if IN_SUBSCRIBER.load(Ordering::Acquire) {
        Ok(())
    } else {
        Err(Error::backend(
            "another global subscriber without the capture layer is already installed",
        ))
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    key_values: Vec<(String, String)>,
    error: Option<ErrorInfo>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.key_values.push((field.name().to_owned(), value));
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.error.is_none() {
            self.error = Some(ErrorInfo::from_error(value));
        }
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{value:?}"));
    }
}

/// The [`Bridge`] for the `tracing` crate.
#[derive(Debug)]
pub struct TracingBridge;

impl Bridge for TracingBridge {
    type Mapper = TracingLevelMapper;

    fn context() -> &'static Hierarchy<LevelFilter, Sink> {
        context()
    }

    fn install() -> Result<(), Error> {
        init()
    }

    fn levels_changed() {
        tracing::callsite::rebuild_interest_cache();
    }
}

/// A capture backend for the `tracing` crate.
pub type TracingBackend = Adapter<TracingBridge>;

/// A [`LogCapturer`] on a fresh [`TracingBackend`].
pub fn capturer() -> LogCapturer<TracingBackend> {
    LogCapturer::new(TracingBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn every_level_round_trips() {
        for level in Level::ALL {
            let native = TracingLevelMapper::to_native(level);
            assert_eq!(TracingLevelMapper::to_neutral(native).unwrap(), level);
        }
        assert_eq!(
            TracingLevelMapper::to_native(Level::Debug),
            LevelFilter::DEBUG
        );
    }

    #[test]
    fn off_has_no_neutral_level() {
        let err = TracingLevelMapper::to_neutral(LevelFilter::OFF).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        let level = err.context("level").unwrap();
        assert!(level.eq_ignore_ascii_case("off"), "{level}");
    }

    #[test]
    fn event_levels_map_to_neutral() {
        assert_eq!(neutral_of(tracing::Level::TRACE), Level::Trace);
        assert_eq!(neutral_of(tracing::Level::DEBUG), Level::Debug);
        assert_eq!(neutral_of(tracing::Level::INFO), Level::Info);
        assert_eq!(neutral_of(tracing::Level::WARN), Level::Warn);
        assert_eq!(neutral_of(tracing::Level::ERROR), Level::Error);
    }
}
