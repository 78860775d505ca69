use crate::error::AcquireError;
use std::io::Read;

/// Minimal blocking HTTP seam so acquisition can run against canned bodies.
pub trait HttpClient: Send + Sync {
    /// Issues a GET and returns the response body as a stream.
    ///
    /// Implementations must map unreachable hosts and non-success statuses
    /// to [`AcquireError::Network`].
    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>, AcquireError>;
}
