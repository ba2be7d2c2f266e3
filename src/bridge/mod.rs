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

//! Bridges from the logging facades into a capture.
//!
//! Each bridge owns a process-wide [`Hierarchy`](crate::Hierarchy) of named loggers, a
//! [`LevelMapper`](crate::LevelMapper) for the facade's level filter, and a
//! [`Bridge`](crate::Bridge) implementation the generic [`Adapter`](crate::Adapter) runs on.

#[cfg(feature = "bridge-log")]
pub mod log;

#[cfg(feature = "bridge-slog")]
pub mod slog;

#[cfg(feature = "bridge-tracing")]
pub mod tracing;
