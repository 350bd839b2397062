use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sequence::{FrameSequence, LoopEdge};

pub const MIN_SPEED: f32 = -2.0;
pub const MAX_SPEED: f32 = 2.0;
pub const MIN_FPS: f32 = 1.0;
pub const MAX_FPS: f32 = 50.0;

/// Beats per loop at speed 0.
const BEATS_PER_LOOP: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Advance one frame per timer tick.
    #[default]
    FreeRun,
    /// Follow the phase of an external transport.
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub mode: PlaybackMode,
    /// Exponential rate control, `2^speed` times the base rate.
    pub speed: f32,
    /// Added to the transport phase in synced mode.
    pub phase_offset: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            mode: PlaybackMode::FreeRun,
            speed: 0.0,
            phase_offset: 0.0,
        }
    }
}

impl PlaybackConfig {
    pub fn clamped(self) -> Self {
        PlaybackConfig {
            mode: self.mode,
            speed: clamp_speed(self.speed),
            phase_offset: clamp_offset(self.phase_offset),
        }
    }
}

fn clamp_speed(speed: f32) -> f32 {
    if speed.is_nan() {
        0.0
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

fn clamp_offset(offset: f32) -> f32 {
    if offset.is_nan() {
        0.0
    } else {
        offset.clamp(0.0, 1.0)
    }
}

/// Last position reported by the host transport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportState {
    /// Position in quarter notes.
    pub ppq_position: f64,
    pub is_playing: bool,
}

/// Fractional position within the current loop, one loop per bar at speed 0.
pub fn transport_phase(ppq_position: f64, speed: f32) -> f32 {
    let loops = ppq_position * 2f64.powf(speed as f64) / BEATS_PER_LOOP;
    let phase = loops.rem_euclid(1.0) as f32;
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if phase >= 1.0 {
        0.0
    } else {
        phase
    }
}

/// Free-run frame rate for a loop of `loop_len` frames.
pub fn frame_rate(speed: f32, loop_len: usize) -> f32 {
    (2f32.powf(clamp_speed(speed)) * loop_len as f32).clamp(MIN_FPS, MAX_FPS)
}

pub fn timer_interval(speed: f32, loop_len: usize) -> Duration {
    Duration::from_millis((1000.0 / frame_rate(speed, loop_len)).floor() as u64)
}

/// What the host's periodic callback should be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running { interval: Duration },
}

/// Drives a [`FrameSequence`] either from a free-running timer or from an
/// external transport.
///
/// The engine never owns a clock. The host arms its own periodic callback
/// according to [`PlaybackEngine::timer`] and calls [`PlaybackEngine::tick`]
/// from it; every `tick` that returns true needs a redraw.
#[derive(Debug, Clone)]
pub struct PlaybackEngine {
    config: PlaybackConfig,
    transport: TransportState,
    timer: TimerState,
    frozen: bool,
}

impl PlaybackEngine {
    pub fn new(config: PlaybackConfig) -> Self {
        PlaybackEngine {
            config: config.clamped(),
            transport: TransportState::default(),
            timer: TimerState::Stopped,
            frozen: false,
        }
    }

    pub fn config(&self) -> PlaybackConfig {
        self.config
    }

    pub fn mode(&self) -> PlaybackMode {
        self.config.mode
    }

    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn timer(&self) -> TimerState {
        self.timer
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn fps(&self, seq: &FrameSequence) -> f32 {
        frame_rate(self.config.speed, seq.loop_window().len())
    }

    pub fn interval(&self, seq: &FrameSequence) -> Duration {
        timer_interval(self.config.speed, seq.loop_window().len())
    }

    /// Arm the timer for the current mode. Call after loading a sequence.
    pub fn start(&mut self, seq: &FrameSequence) {
        self.frozen = false;
        self.rearm(seq);
    }

    fn rearm(&mut self, seq: &FrameSequence) {
        self.timer = match self.config.mode {
            PlaybackMode::FreeRun if !self.frozen => TimerState::Running {
                interval: self.interval(seq),
            },
            _ => TimerState::Stopped,
        };
    }

    pub fn set_mode(&mut self, mode: PlaybackMode, seq: &FrameSequence) {
        if mode != self.config.mode {
            debug!(?mode, "playback mode changed");
        }
        self.config.mode = mode;
        self.rearm(seq);
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.config.speed = clamp_speed(speed);
    }

    pub fn set_phase_offset(&mut self, offset: f32) {
        self.config.phase_offset = clamp_offset(offset);
    }

    pub fn update_transport(&mut self, transport: TransportState) {
        self.transport = transport;
    }

    /// One callback from the host clock. Returns true if the read position
    /// moved and the host should redraw.
    pub fn tick(&mut self, seq: &mut FrameSequence) -> bool {
        if self.frozen {
            return false;
        }
        match self.config.mode {
            PlaybackMode::FreeRun => {
                let TimerState::Running { .. } = self.timer else {
                    return false;
                };
                let moved = seq.advance_one_frame();
                // Speed and loop window may have changed since the last tick.
                self.rearm(seq);
                moved
            }
            PlaybackMode::Synced => {
                if !self.transport.is_playing {
                    return false;
                }
                let phase = transport_phase(self.transport.ppq_position, self.config.speed);
                seq.set_by_phase(phase, self.config.phase_offset)
            }
        }
    }

    /// Stop automatic playback and show frame `idx`.
    pub fn freeze(&mut self, seq: &mut FrameSequence, idx: usize) -> bool {
        if !self.frozen {
            debug!(idx, "playback frozen");
        }
        self.frozen = true;
        self.timer = TimerState::Stopped;
        seq.set_by_index(idx)
    }

    pub fn unfreeze(&mut self, seq: &FrameSequence) {
        if self.frozen {
            debug!("playback resumed");
        }
        self.frozen = false;
        self.rearm(seq);
    }

    /// Move a loop edge while dragging, freezing on the frame under it.
    pub fn drag_loop_edge(
        &mut self,
        seq: &mut FrameSequence,
        edge: LoopEdge,
        fraction: f32,
    ) -> bool {
        match seq.set_loop_edge_at(edge, fraction) {
            Some(idx) => self.freeze(seq, idx),
            None => false,
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::fixtures::{GifBuilder, Image};

    fn sequence(frame_count: usize) -> FrameSequence {
        let mut builder = GifBuilder::new(1, 1, &[[0, 0, 0], [9, 9, 9]]);
        for _ in 0..frame_count {
            builder = builder.image(Image::new(1, 1, &[1]));
        }
        FrameSequence::from_bytes(&builder.build()).unwrap()
    }

    #[test]
    fn config_defaults_and_json() {
        let config: PlaybackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PlaybackConfig::default());

        let config: PlaybackConfig =
            serde_json::from_str(r#"{"mode": "synced", "speed": 5.0}"#).unwrap();
        assert_eq!(config.mode, PlaybackMode::Synced);
        assert_eq!(config.clamped().speed, MAX_SPEED);
        assert_eq!(config.phase_offset, 0.0);

        let json = serde_json::to_string(&PlaybackConfig::default()).unwrap();
        assert!(json.contains(r#""mode":"free_run""#));
    }

    #[test]
    fn controls_are_clamped() {
        let mut engine = PlaybackEngine::new(PlaybackConfig {
            mode: PlaybackMode::FreeRun,
            speed: -9.0,
            phase_offset: 3.0,
        });
        assert_eq!(engine.config().speed, MIN_SPEED);
        assert_eq!(engine.config().phase_offset, 1.0);
        engine.set_speed(f32::NAN);
        assert_eq!(engine.config().speed, 0.0);
        engine.set_phase_offset(-0.5);
        assert_eq!(engine.config().phase_offset, 0.0);
    }

    #[test]
    fn phase_is_one_loop_per_bar() {
        assert_eq!(transport_phase(0.0, 0.0), 0.0);
        assert_eq!(transport_phase(1.0, 0.0), 0.25);
        assert_eq!(transport_phase(6.0, 0.0), 0.5);
        assert_eq!(transport_phase(1.0, 1.0), 0.5);
        assert_eq!(transport_phase(2.0, -1.0), 0.25);
        assert_eq!(transport_phase(-1.0, 0.0), 0.75);
    }

    #[test]
    fn rate_follows_speed_and_loop_length() {
        assert_eq!(frame_rate(0.0, 10), 10.0);
        assert_eq!(frame_rate(1.0, 10), 20.0);
        assert_eq!(frame_rate(2.0, 40), MAX_FPS);
        assert_eq!(frame_rate(-2.0, 2), MIN_FPS);
        assert_eq!(frame_rate(0.0, 0), MIN_FPS);
        assert_eq!(timer_interval(0.0, 8), Duration::from_millis(125));
        assert_eq!(timer_interval(0.0, 3), Duration::from_millis(333));
        assert_eq!(timer_interval(2.0, 100), Duration::from_millis(20));
    }

    #[test]
    fn free_run_advances_and_rearms() {
        let mut seq = sequence(4);
        let mut engine = PlaybackEngine::default();
        assert!(!engine.tick(&mut seq));

        engine.start(&seq);
        assert_eq!(
            engine.timer(),
            TimerState::Running {
                interval: Duration::from_millis(250)
            }
        );
        let visited: Vec<usize> = (0..5)
            .map(|_| {
                assert!(engine.tick(&mut seq));
                seq.read_idx()
            })
            .collect();
        assert_eq!(visited, vec![1, 2, 3, 0, 1]);

        seq.set_loop_window(0, 2);
        engine.set_speed(1.0);
        engine.tick(&mut seq);
        assert_eq!(
            engine.timer(),
            TimerState::Running {
                interval: Duration::from_millis(250)
            }
        );
    }

    #[test]
    fn synced_follows_the_transport() {
        let mut seq = sequence(4);
        let mut engine = PlaybackEngine::new(PlaybackConfig {
            mode: PlaybackMode::Synced,
            ..PlaybackConfig::default()
        });
        engine.start(&seq);
        assert_eq!(engine.timer(), TimerState::Stopped);

        engine.update_transport(TransportState {
            ppq_position: 2.0,
            is_playing: false,
        });
        assert!(!engine.tick(&mut seq));
        assert_eq!(seq.read_idx(), 0);

        engine.update_transport(TransportState {
            ppq_position: 2.0,
            is_playing: true,
        });
        assert!(engine.tick(&mut seq));
        assert_eq!(seq.read_idx(), 2);
        // Same phase, nothing to redraw.
        assert!(!engine.tick(&mut seq));

        engine.set_phase_offset(0.25);
        assert!(engine.tick(&mut seq));
        assert_eq!(seq.read_idx(), 3);
    }

    #[test]
    fn switching_modes_toggles_the_timer() {
        let seq = sequence(2);
        let mut engine = PlaybackEngine::default();
        engine.start(&seq);
        engine.set_mode(PlaybackMode::Synced, &seq);
        assert_eq!(engine.timer(), TimerState::Stopped);
        engine.set_mode(PlaybackMode::FreeRun, &seq);
        assert!(matches!(engine.timer(), TimerState::Running { .. }));
    }

    #[test]
    fn freeze_bypasses_both_modes() {
        let mut seq = sequence(4);
        let mut engine = PlaybackEngine::default();
        engine.start(&seq);

        assert!(engine.freeze(&mut seq, 2));
        assert!(engine.is_frozen());
        assert_eq!(engine.timer(), TimerState::Stopped);
        assert!(!engine.tick(&mut seq));
        assert_eq!(seq.read_idx(), 2);

        engine.unfreeze(&seq);
        assert!(matches!(engine.timer(), TimerState::Running { .. }));
        assert!(engine.tick(&mut seq));
        assert_eq!(seq.read_idx(), 3);
    }

    #[test]
    fn dragging_a_loop_edge_shows_that_frame() {
        let mut seq = sequence(4);
        let mut engine = PlaybackEngine::default();
        engine.start(&seq);

        assert!(engine.drag_loop_edge(&mut seq, LoopEdge::End, 1.0));
        assert_eq!(seq.read_idx(), 3);
        assert!(engine.drag_loop_edge(&mut seq, LoopEdge::Start, 0.5));
        assert_eq!(seq.read_idx(), 2);
        assert!(!engine.drag_loop_edge(&mut seq, LoopEdge::Start, 0.6));
        assert!(engine.is_frozen());

        engine.unfreeze(&seq);
        assert_eq!(
            engine.timer(),
            TimerState::Running {
                interval: Duration::from_millis(500)
            }
        );
    }
}
