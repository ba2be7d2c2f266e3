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

//! The append-only collector behind every capture.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use arc_swap::ArcSwapOption;

use crate::LogEvent;
use crate::echo::Echo;

const IDLE: u8 = 0;
const STARTED: u8 = 1;
const STOPPED: u8 = 2;

/// A thread-safe, append-only, unbounded collector of captured events.
///
/// Events are kept in a persistent linked list behind an [`ArcSwapOption`]: appends publish a new
/// head with a compare-and-swap and never block, and readers take a [`Snapshot`] of the head,
/// which stays valid however many events are appended afterwards.
///
/// Events are only accepted between [`start`](Sink::start) and [`stop`](Sink::stop). Events
/// appended before `stop` remain readable until the sink is dropped.
pub struct Sink {
    state: AtomicU8,
    head: ArcSwapOption<Node>,
    echo: Option<Echo>,
}

struct Node {
    event: Arc<LogEvent>,
    // number of events up to and including this one
    len: usize,
    prev: Option<Arc<Node>>,
}

impl Drop for Node {
    fn drop(&mut self) {
        // unlink iteratively so that long chains do not recurse
        let mut prev = self.prev.take();
        while let Some(node) = prev {
            match Arc::into_inner(node) {
                Some(mut node) => prev = node.prev.take(),
                None => break,
            }
        }
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("started", &self.is_started())
            .field("len", &self.len())
            .field("echo", &self.echo)
            .finish()
    }
}

impl Default for Sink {
    fn default() -> Self {
        Sink::new(None)
    }
}

impl Sink {
    /// Create a sink, optionally echoing every accepted event.
    pub fn new(echo: Option<Echo>) -> Self {
        Sink {
            state: AtomicU8::new(IDLE),
            head: ArcSwapOption::empty(),
            echo,
        }
    }

    /// Start accepting events.
    ///
    /// A stopped sink cannot be restarted.
    pub fn start(&self) {
        let _ = self
            .state
            .compare_exchange(IDLE, STARTED, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Stop accepting events.
    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }

    /// Whether the sink currently accepts events.
    pub fn is_started(&self) -> bool {
        self.state.load(Ordering::Acquire) == STARTED
    }

    /// Append one event. Return whether the event was accepted.
    pub fn append(&self, event: LogEvent) -> bool {
        if !self.is_started() {
            return false;
        }

        if let Some(echo) = &self.echo {
            echo.write(&event);
        }

        let event = Arc::new(event);
        self.head.rcu(|head| {
            let len = head.as_ref().map_or(0, |node| node.len) + 1;
            Some(Arc::new(Node {
                event: Arc::clone(&event),
                len,
                prev: head.clone(),
            }))
        });
        true
    }

    /// The number of events accumulated so far.
    pub fn len(&self) -> usize {
        let head = self.head.load();
        Option::as_ref(&*head).map_or(0, |node| node.len)
    }

    /// Whether no event has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time view of the accumulated events.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            head: self.head.load_full(),
        }
    }
}

/// An immutable view of the events a [`Sink`] had accumulated when the snapshot was taken.
#[derive(Clone)]
pub struct Snapshot {
    head: Option<Arc<Node>>,
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Snapshot {
    /// The number of events in this snapshot.
    pub fn len(&self) -> usize {
        self.head.as_ref().map_or(0, |node| node.len)
    }

    /// Whether this snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Iterate the events in emission order.
    ///
    /// Can be called any number of times.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &LogEvent> + '_ {
        let mut events = Vec::with_capacity(self.len());
        let mut node = self.head.as_deref();
        while let Some(n) = node {
            events.push(&*n.event);
            node = n.prev.as_deref();
        }
        events.reverse();
        events.into_iter()
    }

    /// Copy the events out, in emission order.
    pub fn to_vec(&self) -> Vec<LogEvent> {
        self.iter().cloned().collect()
    }
}
