//! # Error Module
//!
//! The closed error taxonomy surfaced by every dispatch.
//!
//! ## Overview
//!
//! Each failure a request can hit is an [`ApiError`]: a numeric [`ErrorCode`],
//! a human-readable `detail` and an open `extra` payload. The code packs
//! independent category bits with a small discriminator:
//!
//! | Bits          | Meaning                                   |
//! |---------------|-------------------------------------------|
//! | `0b0001_0000` | [`USER_ERROR`] - caused by the caller     |
//! | `0b0010_0000` | [`SERVER_ERROR`] - caused by the server   |
//! | `0b0100_0000` | [`VALIDATION_ERROR`] - validation related |
//! | `0b0000_1111` | discriminator, unique within a category   |
//!
//! The built-in kinds are:
//!
//! - **NotFound** (`17`) - no endpoint is mounted at the requested path
//! - **MethodNotAllowed** (`18`) - carries the allowed `methods`
//! - **InvalidBody** (`19`) - the body was not a JSON object, carries `error`
//! - **AuthenticationRequired** (`20`)
//! - **ValidationFailed** (`85`) - carries every per-field failure in `validation`
//! - **InternalError** (`32`) - never echoes internals to the caller
//!
//! Endpoint logic may return its own [`ApiError`] with any code; the dispatcher
//! passes it through untouched.
//!
//! ## Wire Shape
//!
//! ```rust
//! use sigbind::error::ApiError;
//!
//! let err = ApiError::authentication_required();
//! assert_eq!(err.response()["code"], 20);
//! assert_eq!(err.response()["detail"], "Authentication required.");
//! ```

mod api_error;
mod code;
mod validation;

pub use api_error::ApiError;
pub use code::{ErrorCode, SERVER_ERROR, USER_ERROR, VALIDATION_ERROR};
pub use validation::{FieldErrors, ValidationErrors};
