//! Response channels for Turnpike.
//!
//! A finished run's text has to go somewhere: a chat reply, a task log, the
//! terminal. Drivers hand it to a [`ChannelRegistry`], which picks the sink.
//!
//! Built-in channels:
//! - **log**: records the response as a tracing event (default fallback)
//! - **stdout**: prints the response to the terminal

pub mod log;
pub mod registry;
pub mod stdout;

pub use log::LogChannel;
pub use registry::ChannelRegistry;
pub use stdout::StdoutChannel;
