//! # Types Module
//!
//! Values that travel through the hook chain. Their payloads are opaque JSON:
//! the wire format belongs to the surrounding gateway, not to this crate.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Request`] | Outbound call (provider, model, payload) |
//! | [`Response`] | Result payload with optional usage and error info |
//! | [`Usage`] | Token accounting |
//! | [`ErrorInfo`] | Failure summary attached to error-responses |

pub mod request;
pub mod response;

pub use request::Request;
pub use response::{ErrorInfo, Response, Usage};
