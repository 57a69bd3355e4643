//! Foundation types for Section Swap.
//!
//! A student who holds one class section and wants another registers a
//! [`SwapRequest`]. Every other crate in the workspace depends on the types
//! defined here.
//!
//! # Key Types
//!
//! - [`SwapRequest`] — an immutable, stored (have, want, contact) record
//! - [`NewSwapRequest`] — an unvalidated submission, before the store assigns identity
//! - [`RequestId`] — UUID v7 record identifier
//! - [`ValidationError`] — a required field was missing or blank

pub mod error;
pub mod id;
pub mod request;

pub use error::ValidationError;
pub use id::RequestId;
pub use request::{fields, require, NewSwapRequest, SwapRequest};
