pub mod app;
pub mod check_config;
pub mod commands;
pub mod context;
pub mod deliver;
pub mod dispatch;
pub mod env;
pub mod menus;
pub mod output;
pub mod runtime;

pub use app::run;
