//! Cross-subsystem flows.

mod flows;
mod sessions;
mod signing;
