//! Text decoding and normalization helpers.

pub mod encoding;
pub mod normalize;

pub use encoding::safe_decode;
pub use normalize::normalize_text;
