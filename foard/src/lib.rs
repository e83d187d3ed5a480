//! Foard — collaborative task board client library.

pub mod board;
pub mod cache;
pub mod config;
pub mod identity;
