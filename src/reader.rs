// Lazy forward reader over one stream.
//
// Purpose
// - Page events out of the engine on demand instead of copying a whole
//   stream up front. Restarting a read means opening a new reader.

use std::collections::VecDeque;

use tokio::sync::{mpsc, oneshot};

use crate::core::event::RecordedEvent;
use crate::core::ports::StoreError;
use crate::engine::request::Request;

/// A finite forward read. Events are fetched `batch_size` at a time; the
/// read ends at the stream length observed while paging.
pub struct ForwardReader {
    requests: mpsc::UnboundedSender<Request>,
    stream_id: String,
    next_version: u64,
    batch_size: usize,
    buffer: VecDeque<RecordedEvent>,
    exhausted: bool,
}

impl ForwardReader {
    /// Fetches the first page eagerly, so a read of a never-appended stream
    /// fails here with `StreamNotFound`.
    pub(crate) async fn open(
        requests: mpsc::UnboundedSender<Request>,
        stream_id: &str,
        start_version: u64,
        batch_size: usize,
    ) -> Result<Self, StoreError> {
        let mut reader = Self {
            requests,
            stream_id: stream_id.to_string(),
            next_version: start_version.max(1),
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            exhausted: false,
        };
        reader.fill().await?;
        Ok(reader)
    }

    async fn fill(&mut self) -> Result<(), StoreError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::ReadForward {
                stream_id: self.stream_id.clone(),
                start_version: self.next_version,
                max_count: self.batch_size,
                reply,
            })
            .map_err(|_| StoreError::EngineUnavailable)?;
        let page = response.await.map_err(|_| StoreError::EngineUnavailable)??;
        if page.len() < self.batch_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.next_version = last.stream_version + 1;
        }
        self.buffer.extend(page);
        Ok(())
    }

    /// Next event in stream_version order, or None at the end of the read.
    pub async fn next(&mut self) -> Result<Option<RecordedEvent>, StoreError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fill().await?;
        }
        Ok(self.buffer.pop_front())
    }

    /// Drain the remainder of the read into a Vec.
    pub async fn collect(mut self) -> Result<Vec<RecordedEvent>, StoreError> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await? {
            events.push(event);
        }
        Ok(events)
    }
}
