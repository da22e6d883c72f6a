//! embr-transport — an abstract remote transport (`Transport`), an OpenDAL
//! driver over it, the `metadata.json` wire format, and push/pull/prune sync.

pub mod error;
pub mod metadata;
pub mod opendal_transport;
pub mod sync;
pub mod transport;

pub use error::{Result, TransportError};
pub use metadata::{IndexEntryJson, MetadataSnapshot, ObjectEntryJson};
pub use opendal_transport::OpendalTransport;
pub use sync::{pull, push, PullReport, PushReport};
pub use transport::Transport;
