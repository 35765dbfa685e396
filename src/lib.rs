//! Inbox triage on top of Gmail, Google Calendar and a generative model.
//!
//! The [`analyzer`] turns an email body into an
//! [`EmailAnalysisResult`](email::EmailAnalysisResult); the Google clients
//! act on that result (reply, label, archive, schedule).

pub mod ai;
pub mod analyzer;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod dates;
pub mod email;
pub mod error;
pub mod gmail;
pub mod labels;

pub use error::{Error, Result};
