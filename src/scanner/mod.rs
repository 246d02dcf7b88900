//! Scanner module - where an inbox looks for containers.
//!
//! [`BoundsCalculator`] decides the legal volume around an inbox and
//! [`ShellScanner`] walks it outward, one Chebyshev shell at a time.

pub mod bounds;
pub mod shell;

pub use bounds::{find_claim_containing, BoundsCalculator, ScanRange, UNBOUNDED_VERTICAL};
pub use shell::ShellScanner;
