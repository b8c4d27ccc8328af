//! Input side: row decoding, bounds validation and timeline construction.

pub mod decode;
pub mod timeline;
pub mod validate;
