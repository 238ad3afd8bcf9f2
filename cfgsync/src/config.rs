use crate::batch::DEFAULT_BATCH_SIZE;

/// Settings shared by the reconciling managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Operations per multi-config request.
    pub batch_size: usize,
    /// Ask the device to apply each chunk strict-transactionally.
    pub strict: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            strict: true,
        }
    }
}

impl ManagerConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
