//! Shared protocol timing and threshold constants.

// ── Playback reconciliation ─────────────────────────────────────

/// Maximum tolerated drift in seconds between local and remote playback
/// positions before a corrective seek is issued. Below this, the play/pause
/// flag is still applied but the time value is left alone to avoid
/// micro-seek jitter from ordinary network latency.
pub const SEEK_THRESHOLD_SECS: f64 = 0.6;

/// Minimum interval in milliseconds between outgoing periodic time-sync
/// broadcasts. Play, pause, and seek transitions are never throttled.
pub const HEARTBEAT_THROTTLE_MS: i64 = 1_500;

/// Settle window in milliseconds after any seek, during which locally
/// observed player events are not re-broadcast. Prevents a programmatic
/// corrective seek from being misread as a user action and echoed back.
pub const SEEK_SETTLE_MS: i64 = 800;

// ── Drawing ─────────────────────────────────────────────────────

/// Interval in milliseconds at which buffered pointer samples are flushed
/// into a broadcast stroke batch while a stroke is in progress.
pub const BATCH_FLUSH_MS: u64 = 10;

// ── Transport ───────────────────────────────────────────────────

/// Per-topic broadcast channel capacity. A subscriber that lags by more
/// than this many envelopes starts dropping the oldest.
pub const TOPIC_CAPACITY: usize = 256;
