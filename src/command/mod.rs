use std::time::Duration;

mod bus;
mod capture;
mod check_uart;
mod decode;
mod listen;
mod messages;
mod run_bridge;
mod sensors;

pub use capture::capture;
pub use check_uart::check_uart;
pub use decode::{decode, replay};
pub use listen::listen;
pub use messages::messages;
pub use run_bridge::run_bridge;
pub use sensors::sensors;

/// Upper bound on how long the bus loops wait before checking their timers
const POLL_INTERVAL: Duration = Duration::from_secs(1);
