//! probegrid-http — HTTP health checks for the probegrid registry.
//!
//! Issues a plain `GET` against a target's health endpoint and decodes
//! the JSON body:
//!
//! ```text
//! {"OK": true, "Now": "2024-05-01T12:00:00Z"}
//! ```
//!
//! Lowercase `ok` / `now` keys are accepted as well. Every failure mode
//! (connect, handshake, non-2xx, bad body, timeout) maps onto a
//! [`CheckError`](probegrid_health::CheckError) variant, which the
//! registry records as a plain failure.

pub mod checker;

pub use checker::{HttpCheck, http_check, http_registry};
