//! embr — library surface wiring the content-addressed embedding object
//! store (`embr-core`), its Parquet interchange codec (`embr-parquet`),
//! repository configuration (`embr-config`), and remote sync
//! (`embr-transport`) into the command surface `spec.md` §6 names:
//! `init`, `set`, `switch`, `store`, `log`, `status`, `diff`, `push`,
//! `pull`, `gc`, `merge`, `remote`, `rollback`, `rm`, `get`, `model`,
//! `hooks`, `config`.
//!
//! Argument parsing, help text, and git-hook shell templates stay out of
//! scope (`spec.md` §1) — this crate exposes library functions; an external
//! CLI shell would parse flags and call into `commands`. The bundled binary
//! (`src/main.rs`) is a thin, hand-rolled demonstration of that shell, not a
//! complete one.

pub mod commands;
pub mod remote;
mod tracing_init;

pub use tracing_init::init_tracing;

pub use embr_core::repo::discover_root;
