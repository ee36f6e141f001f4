pub mod edit_log;

pub use edit_log::{Edit, EditLog};
