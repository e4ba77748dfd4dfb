//! Behavior layer of the tunnel management dashboard.
//!
//! A [`page::PageDescriptor`] lists what the server rendered; a
//! [`dashboard::Dashboard`] attaches behavior to it, the
//! [`poller::StatusPoller`] keeps tunnel cards and charts fresh, and
//! [`forms`] guards form submissions.

pub mod charts;
pub mod dashboard;
pub mod forms;
pub mod metrics;
pub mod page;
pub mod poller;
