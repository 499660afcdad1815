//! Benchmark support for AmazeDB.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
