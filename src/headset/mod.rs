//! Accessory-jack management.
//!
//! The manager context lives in [`manager`]; the detection, button,
//! debug and attribute workflows extend it from their own modules.

pub mod attrs;
pub mod button;
pub mod classify;
pub mod debugpoll;
pub mod detect;
pub mod manager;
pub mod notifier;
pub mod scheduler;
pub mod state;
pub mod types;

#[cfg(test)]
pub mod testing;
