//! Adaptive timing correction ("auto-offset").
//!
//! A discrete integral-style controller: each cadence keeps a signed level that
//! grows one step per call while the measured interval misses its target in the
//! same direction. The level indexes an ascending table of correction
//! magnitudes that are subtracted from the cadence offset. Two anti-windup
//! rules apply: a level pointing the wrong way is reset before stepping, and a
//! correction that would leave the half-range around the baseline offset is
//! dropped and the level reset to zero.

use crate::api::config::EngineProperties;

#[derive(Debug, Clone)]
pub struct AutoOffsetConfig {
    /// Deviations at or below this magnitude are ignored (ms).
    pub deadzone_ms: f64,
    /// Correction magnitude per level, ascending (ms).
    pub steps: Vec<f64>,
    /// Maximum distance of the offset from its baseline (ms).
    pub half_range_ms: f64,
}

impl Default for AutoOffsetConfig {
    fn default() -> Self {
        Self {
            deadzone_ms: 0.1,
            steps: vec![0.010, 0.020, 0.030, 0.040, 0.045, 0.050],
            half_range_ms: 2.0,
        }
    }
}

/// Controller state for one cadence.
#[derive(Debug, Clone)]
pub struct OffsetTrack {
    baseline: f64,
    level: i32,
}

impl OffsetTrack {
    pub fn new(baseline: f64) -> Self {
        Self { baseline, level: 0 }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Nudge `offset` toward making `measured` converge on `target`.
    /// Returns true when the offset changed.
    pub fn adjust(
        &mut self,
        offset: &mut f64,
        measured: f64,
        target: f64,
        config: &AutoOffsetConfig,
    ) -> bool {
        let deviation = measured - target;
        if deviation.abs() <= config.deadzone_ms || config.steps.is_empty() {
            return false;
        }

        let max_level = config.steps.len() as i32;
        if deviation > 0.0 {
            // running slow: shorten the interval
            if self.level < 0 {
                self.level = 0;
            }
            if self.level < max_level {
                self.level += 1;
            }
        } else {
            if self.level > 0 {
                self.level = 0;
            }
            if self.level > -max_level {
                self.level -= 1;
            }
        }

        let magnitude = config.steps[(self.level.unsigned_abs() - 1) as usize];
        let candidate = *offset - magnitude * self.level.signum() as f64;
        if (candidate - self.baseline).abs() > config.half_range_ms {
            self.level = 0;
            return false;
        }
        *offset = candidate;
        true
    }
}

/// Auto-offset for both the logic and draw cadences.
#[derive(Debug, Clone)]
pub struct AutoOffset {
    config: AutoOffsetConfig,
    logic: OffsetTrack,
    draw: OffsetTrack,
}

impl AutoOffset {
    /// Baselines are taken from the current offsets in `properties`.
    pub fn new(config: AutoOffsetConfig, properties: &EngineProperties) -> Self {
        Self {
            config,
            logic: OffsetTrack::new(properties.tps_offset),
            draw: OffsetTrack::new(properties.fps_offset),
        }
    }

    /// Adjust `tps_offset` from a measured logic interval (ms).
    pub fn adjust_logic(&mut self, properties: &mut EngineProperties, measured: f64) -> bool {
        let target = 1000.0 / properties.target_tps.max(1) as f64;
        self.logic
            .adjust(&mut properties.tps_offset, measured, target, &self.config)
    }

    /// Adjust `fps_offset` from a measured frame interval (ms).
    pub fn adjust_draw(&mut self, properties: &mut EngineProperties, measured: f64) -> bool {
        let target = 1000.0 / properties.target_fps.max(1) as f64;
        self.draw
            .adjust(&mut properties.fps_offset, measured, target, &self.config)
    }

    pub fn logic_level(&self) -> i32 {
        self.logic.level()
    }

    pub fn draw_level(&self) -> i32 {
        self.draw.level()
    }

    pub fn config(&self) -> &AutoOffsetConfig {
        &self.config
    }
}
