//! The abstract transport contract: `spec.md` §4.6 treats concrete drivers
//! as opaque and only requires this capability set.

use async_trait::async_trait;

use crate::error::TransportError;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the transport against `url`, selecting a driver by scheme.
    async fn open(&mut self, url: &str) -> Result<(), TransportError>;

    /// Establish the underlying connection. A no-op for drivers that are
    /// stateless per-request (filesystem, most object stores).
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn send_data(&mut self, buf: &[u8], remote_key: &str) -> Result<(), TransportError>;

    async fn receive_data(&mut self, remote_key: &str, cap: usize) -> Result<Vec<u8>, TransportError>;

    async fn list_files(&mut self, prefix: &str) -> Result<Vec<String>, TransportError>;

    async fn delete_files(&mut self, prefix: &str, keys: &[String]) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;

    /// The message of the last operation's failure, if any. A `String`
    /// rather than `&TransportError` since some driver error types
    /// (`opendal::Error`) are not `Clone`, and callers only need to report
    /// the failure, not match on it.
    fn get_error(&self) -> Option<&str>;
}
