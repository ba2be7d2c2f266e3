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

//! Logcapture captures log output while a test runs, so the test can assert on it.
//!
//! # Overview
//!
//! A test declares which loggers it captures, by type or by name, each with a minimum level.
//! Starting the capture attaches a collector to those loggers and forces their levels; dropping
//! the [`Capture`] guard detaches it and restores the original levels, also when the test panics.
//!
//! Records of the [`log`], `tracing` and `slog` crates are supported through the bridges in
//! [`bridge`]. Each bridge keeps a process-wide [`Hierarchy`] of named loggers: names are
//! `::`-separated module paths, and a logger inherits the level of its parent.
//!
//! # Examples
//!
//! ```
//! use logcapture::Level;
//! use logcapture::bridge::log::LogBackend;
//! use logcapture::LogCapturer;
//!
//! let capture = LogCapturer::new(LogBackend::new())
//!     .capture_for_logger_at("payments", Level::Warn)
//!     .unwrap()
//!     .start()
//!     .unwrap();
//!
//! log::info!(target: "payments", "charging card");
//! log::warn!(target: "payments", "card declined");
//!
//! let event = capture.assert_first_matching(|e| e.level() == Level::Warn, "a warning");
//! assert_eq!(event.message(), "card declined");
//! assert_eq!(capture.len(), 1);
//! ```
//!
//! Set the `LOGCAPTURE_ECHO` environment variable, e.g. `LOGCAPTURE_ECHO=debug`, to also print
//! captured events to the test output.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod bridge;
pub mod echo;
pub mod layout;
pub mod trap;

mod backend;
pub use backend::Adapter;
pub use backend::Backend;
pub use backend::Bridge;
pub use backend::NativeLevel;
pub use backend::State;

mod capture;
pub use capture::Capture;
pub use capture::LogCapturer;
pub use capture::PanicReporter;
pub use capture::Reporter;

mod error;
pub use error::Error;
pub use error::ErrorKind;

mod event;
pub use event::ErrorInfo;
pub use event::LogEvent;
pub use event::LogEventBuilder;

mod hierarchy;
pub use hierarchy::Hierarchy;
pub use hierarchy::parent;

mod level;
pub use level::Level;
pub use level::LevelMapper;

mod registry;
pub use registry::CaptureIntent;
pub use registry::CaptureRegistry;
pub use registry::LoggerIdentity;

pub mod sink;
pub use sink::Sink;
pub use sink::Snapshot;
