//! # ns-formatters: Debugger Formatters for Engine Containers
//!
//! Teaches a debugger how to display the engine's container, string and math types
//! in a human-readable form instead of raw memory layout. For a recognized value the
//! crate (a) synthesizes the logical children a user wants to expand and (b) produces
//! a one-line summary.
//!
//! ## Architecture
//!
//! - **Backend**: The host capability. An [`Inspector`](backend::Inspector) reads
//!   process memory and exposes the program's type layout through a
//!   [`TypeTable`](backend::TypeTable). [`MockTarget`](backend::MockTarget) is an
//!   in-memory implementation, loadable from a JSON [`Snapshot`](backend::Snapshot).
//! - **Formatters**: One decoder per container family behind the
//!   [`SyntheticProvider`](formatters::SyntheticProvider) contract, plus summary
//!   functions. [`ShapeKind`](formatters::ShapeKind) maps type names to decoders.
//! - **Render**: Turns values into text and indented child trees.
//!
//! ## Configuration
//!
//! Safety ceilings (child count, traversal budget, corruption thresholds) live in
//! [`FormatterSettings`](config::FormatterSettings). The CLI reads them from
//! `config.toml` in the platform config directory under `dev.hxyulin.ns-formatters`:
//!
//! - **Linux**: `~/.config/dev.hxyulin.ns-formatters/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.ns-formatters/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.ns-formatters\`
//!
//! ## Example
//!
//! ```ignore
//! use ns_formatters::{
//!     backend::Snapshot,
//!     config::FormatterSettings,
//!     render::ValueRenderer,
//! };
//!
//! let loaded = Snapshot::load("stopped.json")?.build()?;
//! let settings = FormatterSettings::default();
//! let renderer = ValueRenderer::new(&loaded.target, &settings, 3);
//! for root in &loaded.roots {
//!     print!("{}", renderer.render(root));
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod formatters;
pub mod render;
pub mod types;

// Re-export commonly used types
pub use backend::{Inspector, MockTarget, Snapshot, TypeHandle, TypeTable};
pub use config::{AppConfig, FormatterSettings};
pub use error::{FormatterError, Result};
pub use formatters::{FormatContext, ShapeKind, SummaryFn, SyntheticProvider};
pub use render::{display_text, ValueRenderer};
pub use types::{Value, ValueData, ValueType};
