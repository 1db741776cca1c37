use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An error caused by the caller.
pub const USER_ERROR: u32 = 0b0001_0000;
/// An error caused by the server.
pub const SERVER_ERROR: u32 = 0b0010_0000;
/// An error that involves validation.
pub const VALIDATION_ERROR: u32 = 0b0100_0000;

const CATEGORY_MASK: u32 = USER_ERROR | SERVER_ERROR | VALIDATION_ERROR;
const NUMBER_MASK: u32 = 0b0000_1111;

/// Numeric error code: category bits plus a discriminator.
///
/// Consumers should read [`ErrorCode::categories`] and [`ErrorCode::number`]
/// separately; the packed integer is only the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(u32);

impl ErrorCode {
    /// Nothing is mounted at the requested path.
    pub const NOT_FOUND: ErrorCode = ErrorCode::new(USER_ERROR, 1);
    /// The request method is not in the endpoint's whitelist.
    pub const METHOD_NOT_ALLOWED: ErrorCode = ErrorCode::new(USER_ERROR, 2);
    /// The request body could not be decoded as a JSON object.
    pub const INVALID_BODY: ErrorCode = ErrorCode::new(USER_ERROR, 3);
    /// The endpoint requires an authenticated caller.
    pub const AUTHENTICATION_REQUIRED: ErrorCode = ErrorCode::new(USER_ERROR, 4);
    /// One or more fields failed validation.
    pub const VALIDATION_FAILED: ErrorCode = ErrorCode::new(USER_ERROR | VALIDATION_ERROR, 5);
    /// Anything unanticipated.
    pub const INTERNAL: ErrorCode = ErrorCode::new(SERVER_ERROR, 0);

    /// Combine category bits with a discriminator.
    ///
    /// Bits outside the category mask are dropped from `categories`, and only
    /// the low nibble of `number` is kept.
    #[must_use]
    pub const fn new(categories: u32, number: u32) -> Self {
        ErrorCode((categories & CATEGORY_MASK) | (number & NUMBER_MASK))
    }

    /// Reinterpret a packed wire code.
    #[must_use]
    pub const fn from_u32(raw: u32) -> Self {
        ErrorCode(raw)
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Category bits only.
    #[must_use]
    pub const fn categories(self) -> u32 {
        self.0 & CATEGORY_MASK
    }

    /// Discriminator only.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.0 & NUMBER_MASK
    }

    #[must_use]
    pub const fn is_user(self) -> bool {
        self.0 & USER_ERROR != 0
    }

    #[must_use]
    pub const fn is_server(self) -> bool {
        self.0 & SERVER_ERROR != 0
    }

    #[must_use]
    pub const fn is_validation(self) -> bool {
        self.0 & VALIDATION_ERROR != 0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.0
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(ErrorCode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_codes_match_wire_values() {
        assert_eq!(ErrorCode::NOT_FOUND.as_u32(), 17);
        assert_eq!(ErrorCode::METHOD_NOT_ALLOWED.as_u32(), 18);
        assert_eq!(ErrorCode::INVALID_BODY.as_u32(), 19);
        assert_eq!(ErrorCode::AUTHENTICATION_REQUIRED.as_u32(), 20);
        assert_eq!(ErrorCode::VALIDATION_FAILED.as_u32(), 85);
        assert_eq!(ErrorCode::INTERNAL.as_u32(), 32);
    }

    #[test]
    fn categories_and_number_are_separate() {
        let code = ErrorCode::VALIDATION_FAILED;
        assert!(code.is_user());
        assert!(code.is_validation());
        assert!(!code.is_server());
        assert_eq!(code.categories(), USER_ERROR | VALIDATION_ERROR);
        assert_eq!(code.number(), 5);
    }

    #[test]
    fn user_discriminators_do_not_collide() {
        let user = [
            ErrorCode::NOT_FOUND,
            ErrorCode::METHOD_NOT_ALLOWED,
            ErrorCode::INVALID_BODY,
            ErrorCode::AUTHENTICATION_REQUIRED,
            ErrorCode::VALIDATION_FAILED,
        ];
        let mut numbers: Vec<u32> = user.iter().map(|c| c.number()).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), user.len());
    }

    #[test]
    fn new_masks_stray_bits() {
        let code = ErrorCode::new(USER_ERROR | 0b1000_0000, 0x1f);
        assert_eq!(code.categories(), USER_ERROR);
        assert_eq!(code.number(), 0xf);
    }
}
