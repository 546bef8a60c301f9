pub mod clear;
pub mod common;
pub mod completions;
pub mod count;
pub mod pending;
pub mod report;
pub mod status;
pub mod sync;
pub mod watch;
