//! Feed wire format: frame decoding and subscription frames.

pub mod frame;
pub mod subscription;
