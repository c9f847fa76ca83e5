//! Response envelopes for the notifier HTTP API.
//!
//! Every body is wrapped as `{"_status": 200, "data": ...}` on success and
//! `{"_status": 4xx, "error": {"type": ..., "message": ...}}` on failure.

pub mod response;

pub use self::response::{EncapsulatedJson, EncapsulatedJsonError, Error, ErrorType};
