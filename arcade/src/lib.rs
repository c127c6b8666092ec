//! Host binary support: command line, logging and the run loop.

pub mod app;
pub mod cli;
pub mod logging;

pub use app::run;
pub use cli::Cli;
pub use logging::init_logging;
