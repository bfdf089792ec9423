//! Command implementations for the polirate CLI

pub mod config;
#[cfg(feature = "server")]
pub mod migrate;
pub mod price;
#[cfg(feature = "server")]
pub mod serve;
#[cfg(feature = "server")]
pub mod token;

pub use config::run_config;
#[cfg(feature = "server")]
pub use migrate::run_migrate;
pub use price::run_price;
#[cfg(feature = "server")]
pub use serve::run_serve;
#[cfg(feature = "server")]
pub use token::run_token;
