use std::sync::Arc;

use harvest_core::{Checkpoint, CheckpointStore, Cursor, HarvestError, Record, Symbol};

/// Persists finalized batches and moves the checkpoint with them.
#[derive(Clone)]
pub struct BatchWriter {
    store: Arc<dyn CheckpointStore>,
}

impl BatchWriter {
    /// Writer over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn CheckpointStore>) -> Self {
        Self { store }
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Validate `batch` and commit it together with its new checkpoint.
    ///
    /// `cursor` is the position the batch was fetched from and `anchored`
    /// tells whether that position came from a stored checkpoint. `stored`
    /// is the checkpoint the store held before this batch.
    ///
    /// # Errors
    /// `InvalidArg` for an empty batch, the validation errors of the record
    /// type, `CheckpointRegression` when the batch does not move past
    /// `stored`, and any store failure. Nothing is committed on error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "harvest::persist",
            skip(self, symbol, batch, cursor, stored),
            fields(symbol = %symbol, cursor = %cursor, records = batch.len()),
        )
    )]
    pub async fn persist<R: Record>(
        &self,
        symbol: &Symbol,
        batch: &[R],
        cursor: &Cursor,
        anchored: bool,
        stored: Option<&Checkpoint>,
    ) -> Result<Checkpoint, HarvestError> {
        let last = batch
            .last()
            .ok_or_else(|| HarvestError::InvalidArg("refusing to persist an empty batch".into()))?;
        R::validate(batch, cursor, anchored)?;
        let checkpoint = last.checkpoint();
        if let Some(prev) = stored
            && !checkpoint.is_after(prev)
        {
            return Err(HarvestError::CheckpointRegression {
                stored: prev.to_string(),
                attempted: checkpoint.to_string(),
            });
        }
        self.store
            .append_and_checkpoint(symbol, R::write_batch(batch), checkpoint)
            .await?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            symbol = %symbol,
            dataset = %R::DATASET,
            records = batch.len(),
            checkpoint = %checkpoint,
            "batch committed"
        );
        Ok(checkpoint)
    }
}
