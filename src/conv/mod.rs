//! String encoding conversions.
//!
//! Every string encode/decode helper treats a blank input as a no-op and
//! returns it unchanged without an error.

mod base64;
mod base91;
mod json;

pub use self::base64::{
    base64_decode, base64_encode, base64_to_base64url, base64url_decode, base64url_encode,
    base64url_to_base64,
};
pub use self::base91::{base91_decode, base91_encode};
pub use self::json::{json_decode, json_encode, json_marshal, json_marshal_indent};
