//! Streamable response body, also convertible into a string.

use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream};

use crate::client::{BodySource, SharedClient};
use crate::config::schema::DEFAULT_BUFFER_SIZE;
use crate::error::{Result, StateError};
use crate::observability::metrics;
use crate::timeout::Chunk;

/// Consumption state of a body.
///
/// ```text
/// NotStarted --read_partial--> Streaming --EndOfStream--> Consumed
/// NotStarted --bytes/text----> Materialized
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    NotStarted,
    Streaming,
    Consumed,
    Materialized,
}

/// The payload of one response.
///
/// Every operation that touches the connection first checks that the
/// connection is still on the exchange this body was created for.
pub struct Body<C> {
    client: SharedClient<C>,
    sequence_id: u64,
    state: BodyState,
    // Some exactly when state == Materialized.
    contents: Option<Bytes>,
    buffer_size: usize,
}

impl<C: BodySource> Body<C> {
    /// Bind a body to the connection's current exchange.
    pub async fn new(client: SharedClient<C>) -> Self {
        let sequence_id = client.lock().await.sequence_id();
        Self {
            client,
            sequence_id,
            state: BodyState::NotStarted,
            contents: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Bytes requested per read when iterating or materializing.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Sequence id captured at creation.
    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn state(&self) -> BodyState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == BodyState::Streaming
    }

    /// Read the next chunk, at most `max` bytes.
    ///
    /// Fails with a state error if the connection has moved on, or if the
    /// body was already consumed or materialized.
    pub async fn read_partial(&mut self, max: usize) -> Result<Chunk> {
        let client = Arc::clone(&self.client);
        let mut client = client.lock().await;
        self.check_sequence(client.sequence_id())?;
        self.stream()?;

        let chunk = client.read_partial(max).await?;
        match &chunk {
            Chunk::Data(bytes) => metrics::record_body_bytes(bytes.len()),
            Chunk::EndOfStream => self.state = BodyState::Consumed,
        }
        Ok(chunk)
    }

    /// Lazily iterate over the remaining chunks.
    ///
    /// The stream ends at end-of-stream and cannot be restarted: iterating a
    /// consumed body yields a single `StateError::Consumed`. The stream also
    /// ends after the first error it yields.
    pub fn chunks(&mut self) -> impl Stream<Item = Result<Bytes>> + '_ {
        stream::unfold(Some(self), |body| async move {
            let body = body?;
            let size = body.buffer_size;
            match body.read_partial(size).await {
                Ok(Chunk::Data(bytes)) => Some((Ok(bytes), Some(body))),
                Ok(Chunk::EndOfStream) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Read the whole body into memory, once.
    ///
    /// Later calls return the cached bytes without touching the connection.
    /// If reading fails part-way nothing is cached and the error is returned
    /// as is; the bytes already pulled off the socket are gone, so the body
    /// counts as consumed afterwards.
    pub async fn bytes(&mut self) -> Result<Bytes> {
        if let Some(contents) = &self.contents {
            return Ok(contents.clone());
        }
        match self.state {
            BodyState::Streaming => return Err(StateError::Streaming.into()),
            BodyState::Consumed => return Err(StateError::Consumed.into()),
            BodyState::NotStarted | BodyState::Materialized => {}
        }

        let client = Arc::clone(&self.client);
        let mut client = client.lock().await;
        self.check_sequence(client.sequence_id())?;
        self.state = BodyState::Streaming;

        match drain(&mut *client, self.buffer_size).await {
            Ok(contents) => {
                metrics::record_body_bytes(contents.len());
                tracing::trace!(
                    sequence_id = self.sequence_id,
                    bytes = contents.len(),
                    "Body materialized"
                );
                self.contents = Some(contents.clone());
                self.state = BodyState::Materialized;
                Ok(contents)
            }
            Err(e) => {
                self.state = BodyState::Consumed;
                Err(e)
            }
        }
    }

    /// The whole body as a string; invalid UTF-8 is replaced.
    pub async fn text(&mut self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Whether the body is empty. Materializes the body to find out.
    pub async fn is_empty(&mut self) -> Result<bool> {
        Ok(self.bytes().await?.is_empty())
    }

    fn check_sequence(&self, current: u64) -> Result<()> {
        if self.sequence_id == current {
            return Ok(());
        }
        tracing::warn!(bound = self.sequence_id, current, "Stale response body used");
        metrics::record_stale_body();
        Err(StateError::SequenceMismatch {
            bound: self.sequence_id,
            current,
        }
        .into())
    }

    fn stream(&mut self) -> Result<()> {
        match self.state {
            BodyState::NotStarted | BodyState::Streaming => {
                self.state = BodyState::Streaming;
                Ok(())
            }
            BodyState::Consumed | BodyState::Materialized => Err(StateError::Consumed.into()),
        }
    }
}

/// Accumulate into a local buffer so a failure leaves nothing behind.
async fn drain<C: BodySource>(client: &mut C, size: usize) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Chunk::Data(bytes) = client.read_partial(size).await? {
        buf.extend_from_slice(&bytes);
    }
    Ok(buf.freeze())
}

impl<C> fmt::Debug for Body<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("streaming", &(self.state == BodyState::Streaming))
            .finish_non_exhaustive()
    }
}
