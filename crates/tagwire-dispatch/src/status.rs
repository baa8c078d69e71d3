//! Status codes carried in the response `c` field.
//!
//! Borrowed from HTTP. Handlers may use any other code they see fit.

/// The handler ran and produced a result.
pub const OK: i32 = 200;

/// The payload could not be converted to the handler's type.
pub const BAD_REQUEST: i32 = 400;

/// No handler is registered for the tag.
pub const NOT_FOUND: i32 = 404;

/// The handler could not complete.
pub const INTERNAL_ERROR: i32 = 500;

/// `error` text for [`BAD_REQUEST`] responses built by the dispatcher.
pub const PAYLOAD_CONVERSION_FAILED: &str = "Payload conversion failed";

/// `error` text for [`NOT_FOUND`] responses built by the dispatcher.
pub const FUNCTION_NOT_FOUND: &str = "Function not found";

/// Returns true for codes in the 2xx range.
pub fn is_success(code: i32) -> bool {
    (200..300).contains(&code)
}
