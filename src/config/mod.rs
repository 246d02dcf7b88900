//! Configuration management for the inbox engine.
//!
//! Provides XDG-compliant settings storage with range clamping.

mod settings;

pub use settings::{
    InboxSettings, Paths, HORIZONTAL_RANGE, MIN_INTERVAL_SECS, NOTICE_SECS, VERTICAL_RANGE,
};
