//! Typed clients for both server roles, plus the end-to-end upload
//! orchestration (init with the coordinator, stream chunks to the
//! assigned node, commit).

pub mod coordinator;
pub mod error;
pub mod node;
pub mod upload;

pub use coordinator::CoordinatorClient;
pub use error::{ClientError, ClientResult};
pub use node::NodeClient;
pub use upload::{upload_file, UploadReport};
