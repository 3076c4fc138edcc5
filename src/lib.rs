#![doc = include_str!("../README.md")]

mod accurate;
mod correlation;
mod encoding;
mod error;
mod fmt;
mod sclk;

pub mod extract;

pub use accurate::AccurateTime;
pub use correlation::{SclkScetConverter, SclkScetEntry};
pub use encoding::CoarseFineEncoding;
pub use error::{Error, Result};
pub use fmt::SclkFormatter;
pub use sclk::Sclk;
