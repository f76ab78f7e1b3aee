//! Process wiring for the Brigade waiter and chef.
//!
//! Two binaries share this crate:
//!
//! - `waiter`: HTTP front end that prices orders and publishes them
//! - `chef`: background consumer that turns order events into completed orders
//!
//! Both read [`config::Config`] from the environment, apply the database
//! migrations, connect to the broker with bounded retries and shut down
//! gracefully on SIGINT/SIGTERM.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod lifecycle;
pub mod telemetry;

pub use config::Config;
