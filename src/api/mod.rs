//! REST API HTTP server module.
//!
//! Serves the task collection under `/api/tasks` backed by the SQLite store.

mod server;

pub use server::{ApiServer, ServerHandle, build_router, start_server};
