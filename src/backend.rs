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

//! Attach a capture sink to the loggers of a logging backend.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::CaptureRegistry;
use crate::Error;
use crate::Hierarchy;
use crate::LevelMapper;
use crate::LogEvent;
use crate::echo::Echo;
use crate::sink::Sink;
use crate::sink::Snapshot;
use crate::trap::DefaultTrap;
use crate::trap::Trap;

/// The lifecycle state of a [`Backend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not attached yet.
    Idle,
    /// The sink receives events from the declared loggers.
    Attached,
    /// The sink is detached and the loggers are restored. Terminal.
    Detached,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Idle => "idle",
            State::Attached => "attached",
            State::Detached => "detached",
        };
        f.write_str(s)
    }
}

/// A logging backend a capture can be attached to.
pub trait Backend {
    /// Attach the capture sink to every logger declared in the registry and force their levels.
    ///
    /// # Errors
    ///
    /// Return a config error unless the backend is [`State::Idle`], or a backend error if the
    /// logging backend could not be hooked up. The backend counts as attached even if this
    /// fails, so [`detach`](Backend::detach) undoes the partial work.
    fn attach(&mut self, registry: &CaptureRegistry) -> Result<(), Error>;

    /// The events captured so far, in emission order.
    fn events(&self) -> Vec<LogEvent>;

    /// The number of events captured so far.
    fn len(&self) -> usize;

    /// Detach the capture sink and restore the original levels.
    ///
    /// Does nothing unless the backend is [`State::Attached`].
    fn detach(&mut self);

    /// The current lifecycle state.
    fn state(&self) -> State;
}

/// The native level filter of a bridge.
pub type NativeLevel<B> = <<B as Bridge>::Mapper as LevelMapper>::Native;

/// The glue between the generic [`Adapter`] and one logging backend.
pub trait Bridge: 'static {
    /// Maps neutral levels to the backend's level filter.
    type Mapper: LevelMapper;

    /// The process-wide logger hierarchy records of this backend are routed through.
    fn context() -> &'static Hierarchy<NativeLevel<Self>, Sink>;

    /// Make sure records of this backend reach the [`context`](Bridge::context).
    ///
    /// Called on every attach, so it must be idempotent.
    fn install() -> Result<(), Error>;

    /// Notify the backend that logger levels changed.
    fn levels_changed() {}
}

/// A [`Backend`] for any [`Bridge`].
///
/// One adapter serves one test: it is attached once and detached once, and cannot be re-armed.
pub struct Adapter<B: Bridge> {
    state: State,
    sink: Arc<Sink>,
    // own level of each forced logger before attach, `None` if it inherited
    originals: HashMap<String, Option<NativeLevel<B>>>,
    attached: Vec<String>,
    trap: Box<dyn Trap>,
    _bridge: PhantomData<fn() -> B>,
}

impl<B: Bridge> fmt::Debug for Adapter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("state", &self.state)
            .field("sink", &self.sink)
            .field("originals", &self.originals)
            .field("attached", &self.attached)
            .field("trap", &self.trap)
            .finish()
    }
}

impl<B: Bridge> Default for Adapter<B> {
    fn default() -> Self {
        Adapter::new()
    }
}

impl<B: Bridge> Adapter<B> {
    /// Create an idle adapter.
    ///
    /// Captured events are echoed according to the `LOGCAPTURE_ECHO` environment variable, see
    /// [`Echo::from_default_env`].
    pub fn new() -> Self {
        Adapter {
            state: State::Idle,
            sink: Arc::new(Sink::new(Echo::from_default_env())),
            originals: HashMap::new(),
            attached: vec![],
            trap: Box::new(DefaultTrap::default()),
            _bridge: PhantomData,
        }
    }

    /// Set how captured events are echoed, or disable echo with `None`.
    ///
    /// Events captured so far, if any, are discarded.
    pub fn with_echo(mut self, echo: Option<Echo>) -> Self {
        if self.state == State::Idle {
            self.sink = Arc::new(Sink::new(echo));
        }
        self
    }

    /// Set the trap for errors raised while detaching.
    ///
    /// Default to [`DefaultTrap`].
    pub fn with_trap(mut self, trap: impl Into<Box<dyn Trap>>) -> Self {
        self.trap = trap.into();
        self
    }

    /// A point-in-time view of the captured events.
    pub fn snapshot(&self) -> Snapshot {
        self.sink.snapshot()
    }

    /// The sink this adapter attaches.
    pub fn sink(&self) -> &Arc<Sink> {
        &self.sink
    }
}

impl<B: Bridge> Backend for Adapter<B> {
    fn attach(&mut self, registry: &CaptureRegistry) -> Result<(), Error> {
        if self.state != State::Idle {
            return Err(
                Error::config("capture can only be attached once").with_context("state", self.state)
            );
        }
        self.state = State::Attached;

        B::install()?;
        self.sink.start();

        let context = B::context();
        for intent in registry.iter() {
            let name = intent.logger_name();
            self.originals
                .entry(name.to_owned())
                .or_insert_with(|| context.level(name));
            context.add_appender(name, Arc::clone(&self.sink));
            self.attached.push(name.to_owned());
            context.set_level(name, Some(B::Mapper::to_native(intent.level())));
        }
        B::levels_changed();

        Ok(())
    }

    fn events(&self) -> Vec<LogEvent> {
        self.sink.snapshot().to_vec()
    }

    fn len(&self) -> usize {
        self.sink.len()
    }

    fn detach(&mut self) {
        if self.state != State::Attached {
            return;
        }

        self.sink.stop();
        let context = B::context();
        for name in self.attached.drain(..) {
            if !context.remove_appender(&name, &self.sink) {
                let err = Error::backend("capture sink is no longer attached to logger")
                    .with_context("logger", &name);
                self.trap.trap(&err);
            }
        }
        for (name, level) in self.originals.drain() {
            context.set_level(&name, level);
        }
        B::levels_changed();

        self.state = State::Detached;
    }

    fn state(&self) -> State {
        self.state
    }
}

impl<B: Bridge> Drop for Adapter<B> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;
    use std::sync::Mutex;

    use super::*;
    use crate::ErrorKind;
    use crate::Level;
    use crate::LoggerIdentity;

    struct Identity;

    impl LevelMapper for Identity {
        type Native = Level;

        fn to_native(level: Level) -> Level {
            level
        }

        fn to_neutral(native: Level) -> Result<Level, Error> {
            Ok(native)
        }
    }

    static CONTEXT: LazyLock<Hierarchy<Level, Sink>> =
        LazyLock::new(|| Hierarchy::new(Level::Info));

    struct TestBridge;

    impl Bridge for TestBridge {
        type Mapper = Identity;

        fn context() -> &'static Hierarchy<Level, Sink> {
            &CONTEXT
        }

        fn install() -> Result<(), Error> {
            Ok(())
        }
    }

    struct Unavailable;

    impl Bridge for Unavailable {
        type Mapper = Identity;

        fn context() -> &'static Hierarchy<Level, Sink> {
            &CONTEXT
        }

        fn install() -> Result<(), Error> {
            Err(Error::backend("no backend"))
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Trap for Recorder {
        fn trap(&self, err: &Error) {
            self.0.lock().unwrap().push(err.to_string());
        }
    }

    fn emit(logger: &str, level: Level, message: &str) {
        if level < CONTEXT.effective_level(logger) {
            return;
        }
        let event = LogEvent::builder()
            .logger_name(logger)
            .level(level)
            .message(message)
            .build();
        for sink in CONTEXT.appenders(logger) {
            sink.append(event.clone());
        }
    }

    fn registry(intents: &[(&str, Level)]) -> CaptureRegistry {
        let mut registry = CaptureRegistry::new();
        for (name, level) in intents {
            registry.declare(LoggerIdentity::named(*name), *level).unwrap();
        }
        registry
    }

    fn adapter() -> Adapter<TestBridge> {
        Adapter::new().with_echo(None)
    }

    #[test]
    fn attach_forces_and_detach_restores_levels() {
        CONTEXT.set_level("restore::set", Some(Level::Error));

        let mut adapter = adapter();
        adapter
            .attach(&registry(&[
                ("restore::set", Level::Debug),
                ("restore::unset", Level::Trace),
            ]))
            .unwrap();
        assert_eq!(adapter.state(), State::Attached);
        assert_eq!(CONTEXT.level("restore::set"), Some(Level::Debug));
        assert_eq!(CONTEXT.level("restore::unset"), Some(Level::Trace));

        adapter.detach();
        assert_eq!(adapter.state(), State::Detached);
        assert_eq!(CONTEXT.level("restore::set"), Some(Level::Error));
        assert_eq!(CONTEXT.level("restore::unset"), None);
        assert!(CONTEXT.appenders("restore::unset").is_empty());
    }

    #[test]
    fn events_follow_forced_level() {
        let mut adapter = adapter();
        adapter
            .attach(&registry(&[("forced::svc", Level::Warn)]))
            .unwrap();

        emit("forced::svc", Level::Info, "ignored");
        emit("forced::svc", Level::Warn, "first");
        emit("forced::svc::child", Level::Error, "second");
        emit("forced::other", Level::Error, "elsewhere");

        let messages: Vec<_> = adapter
            .events()
            .into_iter()
            .map(|e| e.message().to_owned())
            .collect();
        assert_eq!(messages, ["first", "second"]);

        adapter.detach();
        emit("forced::svc", Level::Error, "after");
        assert_eq!(adapter.events().len(), 2);
        assert_eq!(adapter.len(), 2);
    }

    #[test]
    fn cannot_be_rearmed() {
        let mut adapter = adapter();
        adapter.attach(&CaptureRegistry::new()).unwrap();
        let err = adapter.attach(&CaptureRegistry::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.context("state"), Some("attached"));

        adapter.detach();
        adapter.detach();
        let err = adapter.attach(&CaptureRegistry::new()).unwrap_err();
        assert_eq!(err.context("state"), Some("detached"));
        assert_eq!(adapter.state(), State::Detached);
    }

    #[test]
    fn detach_before_attach_is_noop() {
        let mut adapter = adapter();
        adapter.detach();
        assert_eq!(adapter.state(), State::Idle);
        assert!(adapter.events().is_empty());
    }

    #[test]
    fn failed_install_still_detaches() {
        let mut adapter: Adapter<Unavailable> = Adapter::new().with_echo(None);
        let err = adapter
            .attach(&registry(&[("failed::install", Level::Info)]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(adapter.state(), State::Attached);

        adapter.detach();
        assert_eq!(adapter.state(), State::Detached);
        assert_eq!(CONTEXT.level("failed::install"), None);
    }

    #[test]
    fn lost_appender_is_trapped() {
        let recorder = Recorder::default();
        let mut adapter = adapter().with_trap(recorder.clone());
        adapter
            .attach(&registry(&[("trapped::svc", Level::Info)]))
            .unwrap();

        assert!(CONTEXT.remove_appender("trapped::svc", adapter.sink()));
        adapter.detach();

        let trapped = recorder.0.lock().unwrap();
        assert_eq!(trapped.len(), 1);
        insta::assert_snapshot!(
            trapped[0],
            @"BackendError: capture sink is no longer attached to logger, context: { logger: trapped::svc }"
        );
    }

    #[test]
    fn drop_detaches() {
        {
            let mut adapter = adapter();
            adapter
                .attach(&registry(&[("dropped::svc", Level::Debug)]))
                .unwrap();
            assert!(!CONTEXT.appenders("dropped::svc").is_empty());
        }
        assert!(CONTEXT.appenders("dropped::svc").is_empty());
        assert_eq!(CONTEXT.level("dropped::svc"), None);
    }
}
