pub mod input;
pub mod lod;
pub mod peak_overlay;
pub mod phase;
pub mod trace;
pub mod trace_renderer;

pub use input::{InputEvent, RendererEvent};
pub use trace_renderer::{TraceFrame, TraceRenderer};
