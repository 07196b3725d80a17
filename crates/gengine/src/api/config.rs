use serde::Deserialize;

use crate::api::error::EngineError;
use crate::api::types::ColorRGBA;

/// How the engine schedules its logic and draw activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum EngineMode {
    /// One thread interleaves logic and draw by cadence.
    #[default]
    Synchronous,
    /// Separate logic and draw threads sharing the context behind a lock.
    Asynchronous,
}

impl std::str::FromStr for EngineMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(EngineMode::Synchronous),
            "async" | "asynchronous" => Ok(EngineMode::Asynchronous),
            other => Err(EngineError::UnknownMode(other.to_string())),
        }
    }
}

/// Configuration consumed by the scheduler.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineProperties {
    /// Logic steps per second.
    pub target_tps: u32,
    /// Draw steps per second.
    pub target_fps: u32,
    /// When disabled, the draw activity runs every other tick.
    pub enable_framelimiter: bool,
    pub title: String,
    pub mode: EngineMode,
    /// Added to the nominal logic interval (ms). Adjusted by the auto-offset controller.
    pub tps_offset: f64,
    /// Added to the nominal frame interval (ms).
    pub fps_offset: f64,
    pub auto_offset: bool,
    /// Rolling window size of the FPS/TPS samplers.
    pub sampler_window: usize,
    /// Margin above the target interval past which a rate is considered poor (ms).
    pub poor_rate_margin_ms: f64,
    /// Advance sprite animation in the logic step instead of the draw step.
    pub animate_on_logic: bool,
    /// Rebuild renderer textures every N frames. 0 disables the schedule;
    /// unset follows the target FPS (see [`Self::texture_rebuild_every`]).
    pub texture_rebuild_frames: Option<u32>,
    pub debug_overlay: bool,
    pub draw_physics_bounds: bool,
    pub clear_color: ColorRGBA,
    /// How long `Engine::stop` waits for the loop thread before giving up.
    pub stop_timeout_ms: u64,
    pub stop_poll_ms: u64,
}

impl Default for EngineProperties {
    fn default() -> Self {
        Self {
            target_tps: 64,
            target_fps: 60,
            enable_framelimiter: true,
            title: "GEngine".to_string(),
            mode: EngineMode::Synchronous,
            tps_offset: 0.0,
            fps_offset: 0.0,
            auto_offset: true,
            sampler_window: 100,
            poor_rate_margin_ms: 3.0,
            animate_on_logic: false,
            texture_rebuild_frames: None,
            debug_overlay: false,
            draw_physics_bounds: false,
            clear_color: ColorRGBA::default(),
            stop_timeout_ms: 2000,
            stop_poll_ms: 5,
        }
    }
}

impl EngineProperties {
    /// Parse properties from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// `1000 / TargetTPS + TPSOffset`, in milliseconds.
    pub fn target_logic_interval(&self) -> f64 {
        1000.0 / self.target_tps.max(1) as f64 + self.tps_offset
    }

    /// `1000 / TargetFPS + FPSOffset`, in milliseconds.
    pub fn target_frame_interval(&self) -> f64 {
        1000.0 / self.target_fps.max(1) as f64 + self.fps_offset
    }

    /// Frames between scheduled texture rebuilds: the explicit setting, or
    /// a tenth of the target FPS (at least 1).
    pub fn texture_rebuild_every(&self) -> u32 {
        self.texture_rebuild_frames
            .unwrap_or_else(|| (self.target_fps / 10).max(1))
    }

    /// Apply loosely-typed key/value pairs from an external loader.
    ///
    /// Unknown keys and malformed values are logged and skipped. Returns the
    /// number of entries applied.
    pub fn apply_config<I, K, V>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut applied = 0;
        for (key, value) in entries {
            let (key, value) = (key.as_ref().trim(), value.as_ref().trim());
            match self.apply_entry(key, value) {
                Some(true) => applied += 1,
                Some(false) => {
                    log::warn!("config: malformed value '{value}' for '{key}', skipped");
                }
                None => {
                    log::warn!("config: unrecognized key '{key}', ignored");
                }
            }
        }
        applied
    }

    /// `None` when the key is unknown, `Some(false)` when the value is malformed.
    fn apply_entry(&mut self, key: &str, value: &str) -> Option<bool> {
        let ok = match key.to_ascii_lowercase().as_str() {
            "targetfps" | "target_fps" => set_parsed(&mut self.target_fps, value, |v| *v > 0),
            "targettps" | "target_tps" => set_parsed(&mut self.target_tps, value, |v| *v > 0),
            "enableframelimiter" | "framelimiter" | "enable_framelimiter" => {
                match parse_flag(value) {
                    Some(flag) => {
                        self.enable_framelimiter = flag;
                        true
                    }
                    None => false,
                }
            }
            "title" | "windowtitle" => {
                self.title = value.trim_matches('"').to_string();
                true
            }
            "mode" => match value.parse::<EngineMode>() {
                Ok(mode) => {
                    self.mode = mode;
                    true
                }
                Err(_) => false,
            },
            "autooffset" | "auto_offset" => match parse_flag(value) {
                Some(flag) => {
                    self.auto_offset = flag;
                    true
                }
                None => false,
            },
            "debugoverlay" | "debug_overlay" => match parse_flag(value) {
                Some(flag) => {
                    self.debug_overlay = flag;
                    true
                }
                None => false,
            },
            "texturerebuildframes" | "texture_rebuild_frames" => match value.parse::<u32>() {
                Ok(frames) => {
                    self.texture_rebuild_frames = Some(frames);
                    true
                }
                Err(_) => false,
            },
            "samplerwindow" | "sampler_window" => {
                set_parsed(&mut self.sampler_window, value, |v| *v >= 2)
            }
            _ => return None,
        };
        Some(ok)
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, value: &str, valid: impl Fn(&T) -> bool) -> bool {
    match value.parse::<T>() {
        Ok(v) if valid(&v) => {
            *slot = v;
            true
        }
        _ => false,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
