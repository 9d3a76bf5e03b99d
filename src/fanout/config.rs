//! Multipipe configuration

/// Default chunk size used by [`MultiPipe::copy_from`](super::MultiPipe::copy_from)
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Configuration options for a [`MultiPipe`](super::MultiPipe)
#[derive(Debug, Clone)]
pub struct MultiPipeConfig {
    /// Name attached to log events
    pub label: String,

    /// Chunk size for relaying an upstream reader
    pub copy_buffer_size: usize,

    /// Number of readers to reserve room for up front
    pub initial_capacity: usize,
}

impl Default for MultiPipeConfig {
    fn default() -> Self {
        Self {
            label: "multipipe".to_string(),
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            initial_capacity: 0,
        }
    }
}

impl MultiPipeConfig {
    /// Create a new config with a custom label
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Set the label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the copy chunk size (at least one byte)
    pub fn copy_buffer_size(mut self, size: usize) -> Self {
        self.copy_buffer_size = size.max(1);
        self
    }

    /// Reserve room for this many readers
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MultiPipeConfig::default();

        assert_eq!(config.label, "multipipe");
        assert_eq!(config.copy_buffer_size, DEFAULT_COPY_BUFFER_SIZE);
        assert_eq!(config.initial_capacity, 0);
    }

    #[test]
    fn test_with_label() {
        let config = MultiPipeConfig::with_label("upload");

        assert_eq!(config.label, "upload");
        assert_eq!(config.copy_buffer_size, DEFAULT_COPY_BUFFER_SIZE);
    }

    #[test]
    fn test_builder_copy_buffer_size_floor() {
        let config = MultiPipeConfig::default().copy_buffer_size(0);

        assert_eq!(config.copy_buffer_size, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = MultiPipeConfig::default()
            .label("tee")
            .copy_buffer_size(4096)
            .initial_capacity(8);

        assert_eq!(config.label, "tee");
        assert_eq!(config.copy_buffer_size, 4096);
        assert_eq!(config.initial_capacity, 8);
    }
}
