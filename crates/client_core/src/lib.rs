//! Client library for the security and infrastructure news backend: typed
//! HTTP access per category, local filtering, changelog parsing, report
//! export and the panel state machine that ties them together.

pub mod changelog;
pub mod error;
pub mod filter;
pub mod panel;
pub mod poll;
pub mod report;
pub mod transport;

pub use error::{ClientError, Result};
pub use filter::{ItemFilter, SeverityFilter};
pub use panel::{FetchMode, FetchOutcome, Panel, PanelEvent, PanelState, ToastLevel};
pub use poll::PollPolicy;
pub use transport::{ApiConnection, FeedApi, HttpFeedClient, DEFAULT_REQUEST_TIMEOUT};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
