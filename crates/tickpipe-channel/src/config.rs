use std::time::Duration;

/// Maximum bytes taken from the channel by one read call.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 256;

/// Transient connect failures are reported on the first attempt and then
/// once every this many attempts.
pub const DEFAULT_UNAVAILABLE_LOG_INTERVAL: u32 = 60;

/// Upper bound on a single frame write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// How many inbound commands one `poll` may dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollPolicy {
    /// Dispatch at most one command per call; the rest wait for later ticks.
    #[default]
    OnePerPoll,
    /// Read everything currently available and dispatch every complete command.
    DrainAll,
}

/// Channel manager tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Maximum bytes per read call. Default: 256.
    pub read_chunk_size: usize,
    /// Report transient connect failures every Nth attempt. Default: 60.
    pub unavailable_log_interval: u32,
    /// Dispatch policy for `poll`. Default: one command per call.
    pub poll_policy: PollPolicy,
    /// Purge buffered partial input when the connection is torn down.
    /// Default: true.
    pub clear_residual_on_disconnect: bool,
    /// Write timeout applied to every new connection. Default: 2s.
    pub write_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            unavailable_log_interval: DEFAULT_UNAVAILABLE_LOG_INTERVAL,
            poll_policy: PollPolicy::OnePerPoll,
            clear_residual_on_disconnect: true,
            write_timeout: Some(DEFAULT_WRITE_TIMEOUT),
        }
    }
}

impl ChannelConfig {
    pub(crate) fn effective_chunk_size(&self) -> usize {
        self.read_chunk_size.max(1)
    }

    pub(crate) fn effective_log_interval(&self) -> u32 {
        self.unavailable_log_interval.max(1)
    }
}
