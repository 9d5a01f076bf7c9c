use std::time::Duration;

use workerchan_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};

/// Bytes requested from the inbound socket per `receive` call.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 50;

/// Channel behavior configuration.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bytes read from the inbound socket per `receive`. Default: 50.
    pub read_chunk_size: usize,
    /// Maximum frame payload in either direction. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Bound on each outbound write. Default: none.
    pub write_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            write_timeout: None,
        }
    }
}

impl ChannelConfig {
    pub(crate) fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
            read_chunk_size: self.read_chunk_size,
            read_timeout: None,
            write_timeout: self.write_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_config_carries_limits() {
        let cfg = ChannelConfig {
            read_chunk_size: 7,
            max_payload_size: 99,
            write_timeout: Some(Duration::from_secs(1)),
        };
        let frame = cfg.frame_config();
        assert_eq!(frame.read_chunk_size, 7);
        assert_eq!(frame.max_payload_size, 99);
        assert_eq!(frame.write_timeout, Some(Duration::from_secs(1)));
        assert!(frame.read_timeout.is_none());
    }
}
