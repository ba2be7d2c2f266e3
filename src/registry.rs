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

//! Declared capture intents.

use std::fmt;

use crate::Error;
use crate::Level;

/// Selects the logger a capture applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LoggerIdentity {
    /// A logger selected by a Rust type.
    ///
    /// The logger name is the module path the type is defined in, which is the default target of
    /// the log calls made inside that module.
    Type {
        /// The full type name, as reported by [`std::any::type_name`].
        type_name: &'static str,
        /// The resolved logger name.
        name: String,
    },
    /// A logger selected by its name.
    Name(String),
}

impl LoggerIdentity {
    /// The identity of the logger of type `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use logcapture::LoggerIdentity;
    ///
    /// struct Worker;
    ///
    /// let identity = LoggerIdentity::of::<Worker>();
    /// assert!(identity.is_type());
    /// assert!(!identity.logger_name().ends_with("Worker"));
    /// ```
    pub fn of<T: ?Sized>() -> Self {
        let type_name = std::any::type_name::<T>();
        LoggerIdentity::Type {
            type_name,
            name: module_of(type_name).to_owned(),
        }
    }

    /// The identity of the logger with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        LoggerIdentity::Name(name.into())
    }

    /// The logger name this identity resolves to.
    pub fn logger_name(&self) -> &str {
        match self {
            LoggerIdentity::Type { name, .. } => name,
            LoggerIdentity::Name(name) => name,
        }
    }

    /// Whether this identity was given by type.
    pub fn is_type(&self) -> bool {
        matches!(self, LoggerIdentity::Type { .. })
    }

    fn describe(&self) -> String {
        match self {
            LoggerIdentity::Type { type_name, .. } => format!("type {type_name}"),
            LoggerIdentity::Name(name) => format!("name {name}"),
        }
    }
}

impl fmt::Display for LoggerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.logger_name())
    }
}

// `a::b::Type<c::D>` -> `a::b`, also behind `&`, `&mut`, raw pointers and `dyn`
fn module_of(type_name: &str) -> &str {
    let mut path = type_name;
    while let Some(rest) = ["&mut ", "&", "*const ", "*mut ", "dyn "]
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
    {
        path = rest;
    }
    // `dyn a::Trait + Send` and `a::Type<T>`
    let path = match path.find(['<', ' ']) {
        Some(pos) => &path[..pos],
        None => path,
    };
    match path.rsplit_once("::") {
        Some((module, _)) => module,
        None => path,
    }
}

/// A logger identity paired with the minimum level to capture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureIntent {
    identity: LoggerIdentity,
    level: Level,
}

impl CaptureIntent {
    /// The selected logger.
    pub fn identity(&self) -> &LoggerIdentity {
        &self.identity
    }

    /// The resolved logger name.
    pub fn logger_name(&self) -> &str {
        self.identity.logger_name()
    }

    /// The minimum level to capture.
    pub fn level(&self) -> Level {
        self.level
    }
}

/// The capture intents declared for one test.
///
/// Each logger may only be declared once, no matter whether it was declared by type or by name.
#[derive(Clone, Debug, Default)]
pub struct CaptureRegistry {
    intents: Vec<CaptureIntent>,
}

impl CaptureRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        CaptureRegistry::default()
    }

    /// Declare a capture intent.
    ///
    /// # Errors
    ///
    /// Return a config error if the logger this identity resolves to is already declared.
    pub fn declare(&mut self, identity: LoggerIdentity, level: Level) -> Result<(), Error> {
        if let Some(existing) = self.get(identity.logger_name()) {
            return Err(Error::config(
                "logger is already captured; each logger must only be captured once",
            )
            .with_context("logger", identity.logger_name())
            .with_context("declared", existing.identity.describe())
            .with_context("redeclared", identity.describe()));
        }

        self.intents.push(CaptureIntent { identity, level });
        Ok(())
    }

    /// Find the intent declared for a logger name.
    pub fn get(&self, name: &str) -> Option<&CaptureIntent> {
        self.intents.iter().find(|i| i.logger_name() == name)
    }

    /// Whether the logger name is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All intents, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &CaptureIntent> {
        self.intents.iter()
    }

    /// Intents declared by type.
    pub fn by_type(&self) -> impl Iterator<Item = &CaptureIntent> {
        self.intents.iter().filter(|i| i.identity.is_type())
    }

    /// Intents declared by name.
    pub fn by_name(&self) -> impl Iterator<Item = &CaptureIntent> {
        self.intents.iter().filter(|i| !i.identity.is_type())
    }

    /// The number of declared intents.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Whether no intent is declared.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
