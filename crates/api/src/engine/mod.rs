//! Submission-side engine components.

pub mod dispatcher;

pub use dispatcher::Dispatcher;
