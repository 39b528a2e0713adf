//! Bus clock configuration.

use crate::Ticks;

/// Bus clock configuration for a system.
///
/// Each system has one crystal-derived bus frequency that drives all
/// timing. Components may run at divided rates, but everything derives
/// from this frequency.
#[derive(Debug, Clone, Copy)]
pub struct MasterClock {
    /// Bus frequency in Hz (e.g. `1_108_404` for a PAL VIC).
    pub frequency_hz: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(frequency_hz: u64) -> Self {
        Self { frequency_hz }
    }

    /// Ticks per frame at the given frame rate (integer division).
    #[must_use]
    pub const fn ticks_per_frame(&self, frames_per_second: u64) -> Ticks {
        Ticks::new(self.frequency_hz / frames_per_second)
    }

    /// Frames per second given a fixed tick count per frame.
    #[must_use]
    pub fn frames_per_second(&self, ticks_per_frame: Ticks) -> f64 {
        self.frequency_hz as f64 / ticks_per_frame.get() as f64
    }
}
