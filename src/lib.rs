//! GIF87a/89a decoding into layered frame sequences, with free-running or
//! transport-synced playback.
//!
//! ```no_run
//! use jif::{Canvas, FrameSequence, PlaybackConfig, PlaybackEngine};
//!
//! let mut seq = FrameSequence::new();
//! seq.load_file("loop.gif")?;
//! let mut engine = PlaybackEngine::new(PlaybackConfig::default());
//! engine.start(&seq);
//! let mut canvas = Canvas::for_sequence(&seq);
//! if engine.tick(&mut seq) {
//!     canvas.render(&mut seq);
//! }
//! # Ok::<(), jif::LoadError>(())
//! ```

pub mod canvas;
pub mod decoder;
pub mod playback;
pub mod sequence;

pub use canvas::Canvas;
pub use decoder::{FormatError, FrameStatus, LoadError, Pixel, RawFrame};
pub use decoder::lzw::StreamCorrupt;
pub use playback::{
    transport_phase, PlaybackConfig, PlaybackEngine, PlaybackMode, TimerState, TransportState,
};
pub use sequence::{
    plan_render, FrameSequence, LoopEdge, LoopWindow, NormalizedFrame, Placement, Rect,
    RenderRegion,
};
