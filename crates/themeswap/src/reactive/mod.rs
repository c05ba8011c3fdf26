#![forbid(unsafe_code)]

//! Single-threaded reactive primitives.

pub mod observable;

pub use observable::{Observable, Subscription};
