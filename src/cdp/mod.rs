//! DevTools protocol plumbing
//!
//! Target discovery over HTTP, the WebSocket transport with its command
//! dispatcher, and the session that ties them to one tab.

pub mod discovery;
pub mod dispatcher;
pub mod session;
pub mod transport;

pub use discovery::{select_target, TargetChoice, TargetDiscovery, TargetInfo};
pub use dispatcher::{Dispatcher, FrameDisposition};
pub use session::Session;
pub use transport::{CdpClient, Protocol};
