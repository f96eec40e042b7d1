//! Command-line front end for pocketnotes.

mod app;
mod args;

pub use app::*;
pub use args::*;
