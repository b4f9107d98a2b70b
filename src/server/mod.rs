//! TCP servers for both roles: the coordinator control plane and the
//! storage node data plane.
//!
//! Both share one skeleton: a generic accept loop that gives every
//! accepted socket its own task, and a per-connection dispatch loop that
//! greets the peer, reads frames, routes each message to the role's
//! handler, and writes exactly one reply per message.

pub mod connection;
pub mod coordinator;
pub mod error;
pub mod node;
pub mod types;

pub use connection::{run_connection, serve_listener, MessageHandler, Reply};
pub use coordinator::CoordinatorServer;
pub use error::{ServerError, ServerResult};
pub use node::NodeServer;
pub use types::{CoordinatorConfig, NodeConfig, ShutdownSignal};
