//! # termkit
//!
//! Terminal UI toolkit for CLI applications.
//!
//! This crate provides reusable building blocks for CLI interfaces:
//! - **Messages**: Consistent info, warning, error, and success output
//! - **Layout**: Headers, sections, aligned key-value pairs
//! - **Progress**: Spinners and multi-stage tracking
//! - **Formatting**: Durations, path truncation, output excerpts
//!
//! ## Quick Start
//!
//! ```no_run
//! use termkit::{format, layout, messages, progress};
//!
//! // Messages
//! messages::info("Starting operation...");
//! messages::success("Done!");
//!
//! // Layout
//! layout::header("Workspace");
//! layout::kv("Version", "1.9.7");
//!
//! // Progress
//! let spinner = progress::spinner("Planning...");
//! // ... do work ...
//! progress::finish_success(&spinner, "Planned");
//!
//! // Formatting
//! let elapsed = format::human_duration(std::time::Duration::from_millis(1500));
//! assert_eq!(elapsed, "1.5s");
//! ```
//!
//! ## Visual language
//!
//! - Success: green checkmark (✓)
//! - Error: red cross (✗)
//! - Warning: yellow warning sign (⚠)
//! - Info: blue info icon (ℹ)
//! - Headers: bold, sections cyan and bold

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod layout;
pub mod messages;
pub mod progress;

pub use format::{excerpt, human_duration, truncate_path};
pub use layout::{header, kv, kv_table, section};
pub use messages::{dim, error, info, success, warn};
pub use progress::{StageProgress, spinner};
