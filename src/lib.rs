// Library target for the benchmarks and integration tests.
// The binary entry point is main.rs; this file re-declares the module tree so
// that they can import types via `pinydr::engine::*` / `pinydr::content::*`.
// Some code is only exercised through the binary, so suppress dead_code warnings.
#![allow(dead_code)]

pub mod config;
pub mod content;
pub mod engine;
pub mod session;
pub mod store;

// Private: the terminal front end, only reachable through the binary
mod app;
mod event;
mod ui;
