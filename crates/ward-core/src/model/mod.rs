//! Data model shared by every lifecycle layer.

pub mod ticket;
