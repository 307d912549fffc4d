//! Connection lifecycle for the harness datastore
//!
//! [`ConnectionManager`] owns the single logical connection. It retries the
//! first connection forever at a fixed interval, then hands reconnection over
//! to the driver and only relays transport changes as [`ConnectionEvent`]s.
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!      ^                        |                  |
//!      +------ failure ---------+                  |
//!      +------------- dispose / transport drop ----+
//! ```

pub mod events;
pub mod manager;
pub mod policy;
pub mod state;

pub use events::ConnectionEvent;
pub use manager::ConnectionManager;
pub use policy::RetryPolicy;
pub use state::{ConnectionHandle, ConnectionState};
