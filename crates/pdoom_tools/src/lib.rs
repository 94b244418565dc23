//! # P(Doom) Development Tools
//!
//! Command-line tools for development:
//! - Content loading and validation
//! - Headless scripted play with verification trails

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod content;
pub mod play;
pub mod validate;
