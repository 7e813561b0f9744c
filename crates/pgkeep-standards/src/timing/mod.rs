//! Operation timing and per-operation statistics

mod collector;


pub use collector::*;
