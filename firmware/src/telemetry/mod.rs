//! Telemetry ring buffer and logging helpers.
//!
//! Keeps the most recent lock events with timestamps, tracks the time between
//! successive events, and mirrors each one to defmt (or stdout on the host) so
//! bring-up sessions can follow key entry without a debugger attached.

#![allow(dead_code)]

use embassy_time::{Duration, Instant};
use heapless::HistoryBuf;
use lock_core::telemetry::LockEvent;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Monotonic identifier assigned to each record.
pub type EventId = u32;

/// Telemetry ring buffer type alias.
pub type TelemetryRing = HistoryBuf<TelemetryRecord, TELEMETRY_RING_CAPACITY>;

/// Telemetry record stored in the ring buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Instant,
    pub event: LockEvent,
    pub elapsed_since_previous: Option<Duration>,
}

/// Records lock events into a fixed-size ring buffer.
pub struct TelemetryRecorder {
    ring: TelemetryRing,
    last_event_at: Option<Instant>,
    next_event_id: EventId,
}

impl TelemetryRecorder {
    /// Creates a new telemetry recorder with an empty history.
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_event_at: None,
            next_event_id: 0,
        }
    }

    /// Returns the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Records `event` and emits a log line for it.
    pub fn record(&mut self, event: LockEvent, timestamp: Instant) -> EventId {
        let elapsed = self
            .last_event_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_event_at = Some(timestamp);

        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            elapsed_since_previous: elapsed,
        });

        emit_log(event, timestamp.as_micros(), elapsed.map(|value| value.as_micros()));
        id
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "none")]
fn emit_log(event: LockEvent, timestamp_us: u64, delta_us: Option<u64>) {
    if let Some(delta) = delta_us {
        defmt::info!("telemetry:lock {} t={}us Δ={}us", event, timestamp_us, delta);
    } else {
        defmt::info!("telemetry:lock {} t={}us", event, timestamp_us);
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(event: LockEvent, timestamp_us: u64, delta_us: Option<u64>) {
    if let Some(delta) = delta_us {
        println!("telemetry:lock {event} t={timestamp_us}us Δ={delta}us");
    } else {
        println!("telemetry:lock {event} t={timestamp_us}us");
    }
}
