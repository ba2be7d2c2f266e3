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

#![cfg(feature = "bridge-tracing")]

use std::io;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use logcapture::ErrorKind;
use logcapture::Level;
use logcapture::bridge::tracing::capturer;
use logcapture::bridge::tracing::context;
use tracing::level_filters::LevelFilter;

mod checkout {
    pub struct Service;

    impl Service {
        pub fn run(&self) {
            tracing::debug!("loading cart");
            tracing::info!(items = 3, "checking out");
            tracing::warn!("inventory low");
        }
    }
}

#[test]
fn captures_only_at_or_above_level() {
    let capture = capturer()
        .capture_for_logger_at("scenario::warn", Level::Warn)
        .unwrap()
        .start()
        .unwrap();

    tracing::info!(target: "scenario::warn", "not captured");
    tracing::warn!(target: "scenario::warn", "disk almost full");
    tracing::error!(target: "scenario::warn", "disk full");

    assert_eq!(capture.len(), 2);
    let event = capture.assert_first_matching(|e| e.level() == Level::Warn, "a warning");
    assert_eq!(event.message(), "disk almost full");
    assert_eq!(event.logger_name(), "scenario::warn");
    assert_eq!(event.raw_message(), None);
    assert_eq!(event.marker(), None);
}

#[test]
fn type_and_name_captures_side_by_side() {
    let capture = capturer()
        .capture_for_type::<checkout::Service>()
        .unwrap()
        .capture_for_logger("CUSTOM_LOGGER")
        .unwrap()
        .start()
        .unwrap();

    checkout::Service.run();
    tracing::info!(target: "CUSTOM_LOGGER", "custom message");

    let event = capture.assert_contains("checking out");
    assert_eq!(event.logger_name(), "tracing_capture::checkout");
    assert_eq!(event.key_value("items"), Some("3"));
    capture.assert_contains("inventory low");
    capture.assert_does_not_contain("loading cart");
    capture.assert_contains("custom message");
    assert_eq!(capture.len(), 3);
}

#[test]
fn detach_restores_levels_exactly() {
    context().set_level("restore::explicit", Some(LevelFilter::ERROR));

    let capture = capturer()
        .capture_for_logger_at("restore::explicit", Level::Debug)
        .unwrap()
        .capture_for_logger_at("restore::inherited", Level::Trace)
        .unwrap()
        .start()
        .unwrap();
    assert_eq!(context().level("restore::explicit"), Some(LevelFilter::DEBUG));
    assert_eq!(context().level("restore::inherited"), Some(LevelFilter::TRACE));

    tracing::trace!(target: "restore::inherited", "very verbose");
    tracing::debug!(target: "restore::explicit", "verbose");
    assert_eq!(capture.stop().len(), 2);

    assert_eq!(context().level("restore::explicit"), Some(LevelFilter::ERROR));
    assert_eq!(context().level("restore::inherited"), None);
}

#[test]
fn fields_and_errors_are_copied() {
    let capture = capturer()
        .capture_for_logger("structured")
        .unwrap()
        .start()
        .unwrap();

    let err = io::Error::new(io::ErrorKind::TimedOut, "upstream timed out");
    tracing::info!(target: "structured", user = "alice", attempt = 3, "login");
    tracing::error!(
        target: "structured",
        cause = &err as &(dyn std::error::Error + 'static),
        "request failed"
    );

    let event = capture.assert_contains("login");
    assert_eq!(event.key_value("user"), Some("alice"));
    assert_eq!(event.key_value("attempt"), Some("3"));
    assert_eq!(event.error(), None);

    let event = capture.assert_contains("request failed");
    assert_eq!(event.error().unwrap().message(), "upstream timed out");
    assert_eq!(event.key_value("cause"), Some("upstream timed out"));
}

#[test]
fn duplicate_declaration_fails() {
    let err = capturer()
        .capture_for_logger("tracing_capture::checkout")
        .unwrap()
        .capture_for_type::<checkout::Service>()
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn records_keep_emission_order() {
    let capture = capturer()
        .capture_for_logger("ordered")
        .unwrap()
        .start()
        .unwrap();

    for i in 0..100 {
        tracing::info!(target: "ordered", "record {i}");
    }

    let events = capture.events();
    assert_eq!(events.len(), 100);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.message(), format!("record {i}"));
    }
}

#[test]
fn concurrent_writer_and_reader() {
    const LOG_COUNT: usize = 100;

    let capture = capturer()
        .capture_for_logger("concurrent")
        .unwrap()
        .start()
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let writer = {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for i in 0..LOG_COUNT {
                tracing::info!(target: "concurrent", "It makes BOOM! {i}");
            }
        })
    };

    barrier.wait();
    let mut last = 0;
    for _ in 0..LOG_COUNT {
        let count = capture.len();
        assert!(count >= last, "count went from {last} to {count}");
        last = count;
    }
    writer.join().unwrap();

    assert_eq!(capture.len(), LOG_COUNT);
}
