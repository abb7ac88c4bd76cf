//! dispatchctl library - the dispatch workflow and its collaborators
//!
//! The binary wires the HTTP client, terminal map and console reporter
//! into a `Dispatcher`. Tests swap them for the fakes in `testing`.

pub mod animator;
pub mod api;
pub mod cancel;
pub mod client;
pub mod config;
pub mod logging;
pub mod lookup;
pub mod narrative;
pub mod orchestrator;
pub mod planner;
pub mod render;
pub mod report;
pub mod selector;
pub mod session;
pub mod status;
pub mod testing; // fakes shared by unit and integration tests
pub mod wire;

pub use api::DispatchApi;
pub use cancel::{cancel_pair, CancelToken, Canceller};
pub use client::HttpDispatchClient;
pub use config::Config;
pub use orchestrator::Dispatcher;
pub use render::{MapRenderer, TerminalMap};
pub use session::DispatchSession;
pub use status::{ConsoleReporter, StatusReporter};
