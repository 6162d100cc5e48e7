//! Networking and domain model for the chat server: the wire framer, the
//! session type, the user and channel registries, the command dispatcher and
//! the connection multiplexer that ties them together.

mod dispatch;
mod framer;
mod registry;
mod server;
mod session;

pub use registry::channel::{Channel, ChannelRegistry};
pub use registry::user::{User, UserRegistry};
pub use server::ChatServer;
pub use session::Session;
