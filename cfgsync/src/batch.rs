use tokio_util::sync::CancellationToken;
use tracing::debug;
use xmlapi_core::{Element, Operation};

use crate::codec::{Client, call};
use crate::error::{Stage, SyncError};

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Accumulates mutations and seals them into chunks of at most `batch_size`.
#[derive(Debug)]
pub struct Batch {
    batch_size: usize,
    chunks: Vec<Vec<Operation>>,
}

impl Batch {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            chunks: Vec::new(),
        }
    }

    pub fn push(&mut self, op: Operation) {
        match self.chunks.last_mut() {
            Some(chunk) if chunk.len() < self.batch_size => chunk.push(op),
            _ => {
                let mut chunk = Vec::with_capacity(self.batch_size.min(64));
                chunk.push(op);
                self.chunks.push(chunk);
            }
        }
    }

    pub fn edit(&mut self, xpath: String, element: Element) {
        self.push(Operation::Edit { xpath, element });
    }

    pub fn delete(&mut self, xpath: String) {
        self.push(Operation::Delete { xpath });
    }

    pub fn rename(&mut self, xpath: String, new_name: String) {
        self.push(Operation::Rename { xpath, new_name });
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Vec<Operation>] {
        &self.chunks
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.chunks.iter().flatten()
    }

    /// Submits all chunks in order. An empty batch is not sent.
    pub async fn flush<C>(
        self,
        client: &C,
        strict: bool,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError>
    where
        C: Client + ?Sized,
    {
        if self.is_empty() {
            return Ok(());
        }
        debug!(
            operations = self.len(),
            chunks = self.chunks.len(),
            "flushing batch"
        );
        let responses = call(
            cancel,
            Stage::Write,
            client.chunked_multi_config(&self.chunks, strict, &[]),
        )
        .await?;
        for response in &responses {
            response
                .ensure_success()
                .map_err(|source| SyncError::Transport {
                    stage: Stage::Write,
                    source,
                })?;
        }
        Ok(())
    }
}
