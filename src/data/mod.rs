pub mod peaks;
pub mod series;
pub mod spectrum;
