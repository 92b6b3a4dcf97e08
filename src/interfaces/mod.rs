//! Outer surfaces exposing the engine.

pub mod http;
