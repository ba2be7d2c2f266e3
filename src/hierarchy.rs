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

//! A named-logger hierarchy with inherited levels and additive appenders.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

/// The own configuration of one logger.
struct LoggerConfig<F, A> {
    level: Option<F>,
    appenders: Vec<Arc<A>>,
}

impl<F: Copy, A> Clone for LoggerConfig<F, A> {
    fn clone(&self) -> Self {
        LoggerConfig {
            level: self.level,
            appenders: self.appenders.clone(),
        }
    }
}

impl<F, A> LoggerConfig<F, A> {
    fn is_empty(&self) -> bool {
        self.level.is_none() && self.appenders.is_empty()
    }
}

type Loggers<F, A> = BTreeMap<String, Arc<LoggerConfig<F, A>>>;

/// A process-wide registry of named loggers.
///
/// Logger names are `::`-separated paths, the same shape as Rust module paths. A logger without
/// an own level inherits the level of its closest configured ancestor, and falls back to the
/// hierarchy's default level. Appenders are additive: a record sent to `a::b::c` reaches the
/// appenders of `a::b::c`, `a::b` and `a`.
///
/// Reads are lock-free. Updates copy the map and publish it atomically, so concurrent updates
/// to different loggers never lose each other.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use logcapture::Hierarchy;
/// use logcapture::Level;
///
/// let hierarchy: Hierarchy<Level, &str> = Hierarchy::new(Level::Info);
/// hierarchy.set_level("my_crate", Some(Level::Debug));
/// hierarchy.add_appender("my_crate", Arc::new("console"));
///
/// assert_eq!(hierarchy.effective_level("my_crate::db"), Level::Debug);
/// assert_eq!(hierarchy.effective_level("other"), Level::Info);
/// assert_eq!(hierarchy.appenders("my_crate::db").len(), 1);
/// ```
pub struct Hierarchy<F, A> {
    default_level: F,
    loggers: ArcSwap<Loggers<F, A>>,
}

impl<F, A> fmt::Debug for Hierarchy<F, A>
where
    F: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loggers = self.loggers.load();
        let loggers: BTreeMap<&str, (Option<&F>, usize)> = loggers
            .iter()
            .map(|(name, config)| (name.as_str(), (config.level.as_ref(), config.appenders.len())))
            .collect();
        f.debug_struct("Hierarchy")
            .field("default_level", &self.default_level)
            .field("loggers", &loggers)
            .finish()
    }
}

impl<F, A> Hierarchy<F, A>
where
    F: Copy,
{
    /// Create an empty hierarchy.
    pub fn new(default_level: F) -> Self {
        Hierarchy {
            default_level,
            loggers: ArcSwap::from_pointee(BTreeMap::new()),
        }
    }

    /// The level of loggers that neither have an own level nor a configured ancestor.
    pub fn default_level(&self) -> F {
        self.default_level
    }

    /// The own level of a logger, or `None` if it inherits.
    pub fn level(&self, name: &str) -> Option<F> {
        self.loggers.load().get(name).and_then(|config| config.level)
    }

    /// Set or unset the own level of a logger.
    pub fn set_level(&self, name: &str, level: Option<F>) {
        self.update(name, |config| config.level = level);
    }

    /// The level the logger actually filters at.
    pub fn effective_level(&self, name: &str) -> F {
        let loggers = self.loggers.load();
        lineage(name)
            .find_map(|name| loggers.get(name).and_then(|config| config.level))
            .unwrap_or(self.default_level)
    }

    /// Add an appender to a logger.
    pub fn add_appender(&self, name: &str, appender: Arc<A>) {
        self.update(name, |config| config.appenders.push(Arc::clone(&appender)));
    }

    /// Remove an appender from a logger. Return whether it was found.
    pub fn remove_appender(&self, name: &str, appender: &Arc<A>) -> bool {
        let mut found = false;
        self.update(name, |config| {
            let before = config.appenders.len();
            config.appenders.retain(|a| !Arc::ptr_eq(a, appender));
            found = config.appenders.len() != before;
        });
        found
    }

    /// All appenders a record sent to this logger reaches, closest logger first.
    ///
    /// An appender attached to more than one logger of the lineage is only returned once.
    pub fn appenders(&self, name: &str) -> Vec<Arc<A>> {
        let loggers = self.loggers.load();
        let mut appenders: Vec<Arc<A>> = vec![];
        for name in lineage(name) {
            let Some(config) = loggers.get(name) else {
                continue;
            };
            for appender in &config.appenders {
                if !appenders.iter().any(|a| Arc::ptr_eq(a, appender)) {
                    appenders.push(Arc::clone(appender));
                }
            }
        }
        appenders
    }

    /// Names of the loggers that have an own level or appenders.
    pub fn configured(&self) -> Vec<String> {
        self.loggers.load().keys().cloned().collect()
    }

    fn update(&self, name: &str, mut f: impl FnMut(&mut LoggerConfig<F, A>)) {
        self.loggers.rcu(|loggers| {
            let mut loggers = Loggers::clone(loggers);
            let mut config = match loggers.get(name) {
                Some(config) => LoggerConfig::clone(config),
                None => LoggerConfig {
                    level: None,
                    appenders: vec![],
                },
            };
            f(&mut config);
            if config.is_empty() {
                loggers.remove(name);
            } else {
                loggers.insert(name.to_owned(), Arc::new(config));
            }
            loggers
        });
    }
}

/// The parent of a logger name, e.g. `a::b` for `a::b::c`.
pub fn parent(name: &str) -> Option<&str> {
    name.rsplit_once("::").map(|(parent, _)| parent)
}

// the logger itself, then each ancestor up to the top-level segment
fn lineage(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(name), |name| parent(*name))
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::Level;

    fn names(appenders: &[Arc<&'static str>]) -> Vec<&'static str> {
        appenders.iter().map(|a| **a).collect()
    }

    #[test]
    fn parent_splits_on_path_separator() {
        assert_eq!(parent("a::b::c"), Some("a::b"));
        assert_eq!(parent("a"), None);
        assert_eq!(lineage("a::b::c").collect::<Vec<_>>(), ["a::b::c", "a::b", "a"]);
    }

    #[test]
    fn levels_are_inherited() {
        let hierarchy: Hierarchy<Level, ()> = Hierarchy::new(Level::Info);
        hierarchy.set_level("app", Some(Level::Warn));

        assert_eq!(hierarchy.level("app"), Some(Level::Warn));
        assert_eq!(hierarchy.level("app::db"), None);
        assert_eq!(hierarchy.effective_level("app::db"), Level::Warn);
        // no segment match on a plain prefix
        assert_eq!(hierarchy.effective_level("application"), Level::Info);

        hierarchy.set_level("app::db", Some(Level::Trace));
        assert_eq!(hierarchy.effective_level("app::db::pool"), Level::Trace);

        hierarchy.set_level("app", None);
        assert_eq!(hierarchy.level("app"), None);
        assert_eq!(hierarchy.effective_level("app"), Level::Info);
        assert_eq!(hierarchy.configured(), ["app::db"]);
    }

    #[test]
    fn appenders_are_additive_and_deduplicated() {
        let hierarchy: Hierarchy<Level, &'static str> = Hierarchy::new(Level::Info);
        let root = Arc::new("root");
        let db = Arc::new("db");
        hierarchy.add_appender("app", Arc::clone(&root));
        hierarchy.add_appender("app::db", Arc::clone(&db));
        hierarchy.add_appender("app::db::pool", Arc::clone(&root));

        assert_eq!(names(&hierarchy.appenders("app::db::pool")), ["root", "db"]);
        assert_eq!(names(&hierarchy.appenders("app::web")), ["root"]);
        assert!(hierarchy.appenders("other").is_empty());

        assert!(hierarchy.remove_appender("app::db", &db));
        assert!(!hierarchy.remove_appender("app::db", &db));
        assert!(!hierarchy.remove_appender("missing", &db));
        assert_eq!(names(&hierarchy.appenders("app::db")), ["root"]);
        assert_eq!(hierarchy.configured(), ["app", "app::db::pool"]);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let hierarchy: Arc<Hierarchy<Level, usize>> = Arc::new(Hierarchy::new(Level::Info));
        let workers: Vec<_> = (0..8)
            .map(|i| {
                let hierarchy = Arc::clone(&hierarchy);
                thread::spawn(move || {
                    let name = format!("worker{i}");
                    for _ in 0..50 {
                        hierarchy.add_appender(&name, Arc::new(i));
                        hierarchy.set_level(&name, Some(Level::Debug));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        for i in 0..8 {
            let name = format!("worker{i}");
            assert_eq!(hierarchy.appenders(&name).len(), 50);
            assert_eq!(hierarchy.level(&name), Some(Level::Debug));
        }
    }
}
