//! Platform-fee policy.
//!
//! The fee percentage comes from outside the engine (platform billing); the
//! policy seam keeps order construction testable and lets the percentage
//! vary per deployment without touching the purchase flow.

/// Supplies the platform's cut of each order, as a percentage
pub trait PlatformFeePolicy: Send + Sync {
    /// Current fee percentage applied at order creation
    fn fee_percent(&self) -> u8;
}

/// Constant fee percentage, configured at startup
#[derive(Clone, Copy, Debug)]
pub struct FixedFeePolicy {
    percent: u8,
}

impl FixedFeePolicy {
    /// Creates a policy charging `percent` of each order
    #[must_use]
    pub const fn new(percent: u8) -> Self {
        Self { percent }
    }
}

impl PlatformFeePolicy for FixedFeePolicy {
    fn fee_percent(&self) -> u8 {
        self.percent
    }
}
