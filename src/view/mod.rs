pub mod axis;
pub mod viewport;

pub use viewport::{Camera2D, Margins, Span, Viewport};
