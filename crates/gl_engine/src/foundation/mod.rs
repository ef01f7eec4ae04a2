//! Foundation module
//!
//! Shared utilities with no GPU dependency: nalgebra type aliases and
//! projection helpers in [`math`], env_logger setup in [`logging`].

pub mod logging;
pub mod math;
