//! Bounded request body buffering

use crate::error::{Result, SplicerError};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};

/// Collect a body stream into one buffer, failing once it exceeds `limit` bytes
///
/// # Errors
/// - `SplicerError::PayloadTooLarge` past the limit
/// - `SplicerError::Processing` when the stream itself fails
pub async fn read_body<S, E>(mut stream: S, limit: usize) -> Result<Bytes>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut body = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| SplicerError::processing(format!("Failed to read request body: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(SplicerError::PayloadTooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
