pub mod config;
pub mod constants;
pub mod format;
pub mod handle;
pub mod page;
pub mod panels;
pub mod plugin;
pub mod rate;
pub mod session;
pub mod utils;
pub mod widget;
