//! Update source contract shared by long polling and the webhook receiver.

use futures::stream::BoxStream;

use crate::types::Update;

/// A provider of externally delivered updates.
///
/// Implementations expose a lazy, typically infinite stream. Items arrive in
/// source order and an already-delivered `update_id` is never repeated.
/// Dropping the stream must cancel any in-flight work promptly.
pub trait UpdateSource {
    fn updates(&mut self) -> BoxStream<'_, Update>;
}
