//! Client for the task API: HTTP data service and the view-state controller.

pub mod controller;
pub mod debounce;
pub mod service;

pub use controller::{StatusFilter, TaskController, ViewState};
pub use debounce::Debouncer;
pub use service::{ClientError, TaskApi, TaskService};
