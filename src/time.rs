use crate::error::{EngineError, Result};
use std::time::Duration;

/// Converts delta-time ticks into wall-clock time for a given tempo.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TimeBase {
    microseconds_per_quarter_note: u32,
}

impl TimeBase {
    pub const TICKS_PER_QUARTER_NOTE: u32 = 480;
    pub const DEFAULT_MICROSECONDS_PER_QUARTER_NOTE: u32 = 500_000;

    pub fn new(microseconds_per_quarter_note: u32) -> Result<Self> {
        if microseconds_per_quarter_note == 0 {
            return Err(EngineError::invalid("tempo", microseconds_per_quarter_note));
        }
        Ok(Self {
            microseconds_per_quarter_note,
        })
    }

    pub fn from_bpm(bpm: f64) -> Result<Self> {
        let micros = (60_000_000.0 / bpm).round();
        if !micros.is_finite() || micros < 1.0 || micros > u32::MAX as f64 {
            return Err(EngineError::invalid("tempo", bpm as u32));
        }
        Self::new(micros as u32)
    }

    pub fn microseconds_per_quarter_note(&self) -> u32 {
        self.microseconds_per_quarter_note
    }

    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.microseconds_per_quarter_note as f64
    }

    /// Converts a tick offset into a delay, rounding down to the nanosecond.
    pub fn to_delay(&self, ticks: u32) -> Duration {
        let nanos = ticks as u128 * self.microseconds_per_quarter_note as u128 * 1000
            / Self::TICKS_PER_QUARTER_NOTE as u128;
        Duration::new(
            (nanos / 1_000_000_000) as u64,
            (nanos % 1_000_000_000) as u32,
        )
    }

    /// Converts a delay back into whole ticks, rounding down.
    pub fn to_ticks(&self, delay: Duration) -> u64 {
        let ticks = delay.as_nanos() * Self::TICKS_PER_QUARTER_NOTE as u128
            / (self.microseconds_per_quarter_note as u128 * 1000);
        ticks.min(u64::MAX as u128) as u64
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self {
            microseconds_per_quarter_note: Self::DEFAULT_MICROSECONDS_PER_QUARTER_NOTE,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quarter_note_at_default_tempo() {
        let time_base = TimeBase::default();
        assert_eq!(time_base.to_delay(480), Duration::from_millis(500));
        assert_eq!(time_base.to_delay(0), Duration::ZERO);
        assert_eq!(time_base.bpm(), 120.0);
    }

    #[test]
    fn test_sub_millisecond_precision() {
        let time_base = TimeBase::default();
        // 500_000_000 / 480 ns per tick
        assert_eq!(time_base.to_delay(1), Duration::from_nanos(1_041_666));
        assert_eq!(time_base.to_delay(0x135), Duration::from_nanos(321_875_000));
    }

    #[test]
    fn test_tempo_validation() {
        assert!(TimeBase::new(0).is_err());
        assert!(TimeBase::from_bpm(0.0).is_err());
        assert_eq!(TimeBase::from_bpm(60.0).unwrap().microseconds_per_quarter_note(), 1_000_000);
    }

    #[test]
    fn test_to_ticks_inverts_to_delay() {
        let time_base = TimeBase::default();
        assert_eq!(time_base.to_ticks(time_base.to_delay(960)), 960);
        // Floor rounding in both directions may lose a tick.
        assert_eq!(time_base.to_ticks(time_base.to_delay(0x2D3B)), 0x2D3B - 1);
        assert_eq!(time_base.to_ticks(Duration::from_secs(1)), 960);
    }

    proptest! {
        #[test]
        fn to_delay_is_linear(ticks in 0u32..1_000_000, tempo in 1u32..10_000_000) {
            let time_base = TimeBase::new(tempo).unwrap();
            let single = time_base.to_delay(ticks).as_nanos();
            let double = time_base.to_delay(2 * ticks).as_nanos();
            // Flooring each side can differ by at most one nanosecond.
            prop_assert!(double >= 2 * single && double - 2 * single <= 1);
        }

        #[test]
        fn to_delay_is_exactly_linear_on_whole_ticks(quarters in 0u32..10_000) {
            let time_base = TimeBase::default();
            let ticks = quarters * 3;
            prop_assert_eq!(time_base.to_delay(2 * ticks), 2 * time_base.to_delay(ticks));
        }
    }
}
