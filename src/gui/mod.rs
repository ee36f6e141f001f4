pub mod contour_panel;
pub mod theme;
pub mod trace_panel;
