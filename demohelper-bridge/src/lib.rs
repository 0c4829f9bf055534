//! DemoHelper bridge library target.
//!
//! The binary entry point is in `main.rs`; the wiring lives here so
//! `tests/` can drive it over an in-memory console.

pub mod app;
pub mod util;
