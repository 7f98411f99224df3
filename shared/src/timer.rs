use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{CRITICAL_THRESHOLD_SECS, DEFAULT_MAX_TIME, WARNING_THRESHOLD_SECS};

pub type ParticipantId = u8;

/// One participant's countdown as reported by the server.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    #[serde(rename = "remaining_time", default)]
    pub remaining_seconds: u32,
    #[serde(default)]
    pub running: bool,
    #[serde(rename = "max_time", default = "default_max_time")]
    pub max_seconds: u32,
}

fn default_max_time() -> u32 {
    DEFAULT_MAX_TIME
}

/// Payload of a `timer_update` event, keyed by participant id.
pub type TimerUpdate = BTreeMap<ParticipantId, TimerState>;

/// A timer reading together with the local instant it arrived at.
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSnapshot {
    pub captured_at_ms: f64,
    pub timers: TimerUpdate,
}

/// Rebuilds a smooth countdown from irregular server snapshots.
///
/// The stored snapshot is only ever replaced as a whole. Reads are pure
/// functions of the snapshot and the instant passed in.
#[derive(Debug, Default, Clone)]
pub struct TimerReconciler {
    snapshot: Option<TimerSnapshot>,
}

impl TimerReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest_snapshot(&mut self, timers: TimerUpdate, now_ms: f64) {
        log::debug!("timer snapshot for {} participant(s)", timers.len());
        self.snapshot = Some(TimerSnapshot {
            captured_at_ms: now_ms,
            timers,
        });
    }

    pub fn has_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&TimerSnapshot> {
        self.snapshot.as_ref()
    }

    /// Countdown for `participant` at `now_ms`, or `None` while nothing is known.
    pub fn compute_display(&self, participant: ParticipantId, now_ms: f64) -> Option<TimerState> {
        let snapshot = self.snapshot.as_ref()?;
        let stored = snapshot.timers.get(&participant)?;
        Some(project(stored, elapsed_seconds(snapshot.captured_at_ms, now_ms)))
    }

    pub fn compute_all(&self, now_ms: f64) -> TimerUpdate {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return TimerUpdate::new();
        };
        let elapsed = elapsed_seconds(snapshot.captured_at_ms, now_ms);
        snapshot
            .timers
            .iter()
            .map(|(id, stored)| (*id, project(stored, elapsed)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
    }
}

fn elapsed_seconds(captured_at_ms: f64, now_ms: f64) -> u32 {
    let elapsed = ((now_ms - captured_at_ms) / 1000.0).floor();
    if elapsed.is_finite() && elapsed > 0.0 {
        elapsed.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

fn project(stored: &TimerState, elapsed: u32) -> TimerState {
    let spent = if stored.running { elapsed } else { 0 };
    TimerState {
        remaining_seconds: stored.remaining_seconds.saturating_sub(spent),
        running: stored.running,
        max_seconds: stored.max_seconds,
    }
}

/// Recurring jobs a display keeps alive for its timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    RenderTick,
    SnapshotPoll,
}

/// Starts recurring callbacks. Dropping the returned handle cancels it.
pub trait IntervalScheduler {
    type Handle;

    fn every(&mut self, task: TimerTask, period_ms: u32) -> Self::Handle;
}

/// Owns the render tick and the snapshot poll of one display.
///
/// The poll only runs until the first snapshot lands; after that the tick is
/// the sole interval. Neither is ever started twice.
pub struct TimerSchedule<H> {
    ticker: Option<H>,
    poller: Option<H>,
    tick_ms: u32,
    poll_ms: u32,
}

impl<H> TimerSchedule<H> {
    pub fn new(tick_ms: u32, poll_ms: u32) -> Self {
        Self {
            ticker: None,
            poller: None,
            tick_ms,
            poll_ms,
        }
    }

    pub fn start<S>(&mut self, scheduler: &mut S, has_snapshot: bool)
    where
        S: IntervalScheduler<Handle = H>,
    {
        if self.ticker.is_none() {
            self.ticker = Some(scheduler.every(TimerTask::RenderTick, self.tick_ms));
        }
        if !has_snapshot && self.poller.is_none() {
            self.poller = Some(scheduler.every(TimerTask::SnapshotPoll, self.poll_ms));
        }
    }

    pub fn on_snapshot<S>(&mut self, scheduler: &mut S)
    where
        S: IntervalScheduler<Handle = H>,
    {
        if self.poller.take().is_some() {
            log::debug!("first timer snapshot received, polling stopped");
        }
        if self.ticker.is_none() {
            self.ticker = Some(scheduler.every(TimerTask::RenderTick, self.tick_ms));
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    pub fn stop(&mut self) {
        self.ticker = None;
        self.poller = None;
    }
}

/// How close a countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

impl Urgency {
    pub fn for_remaining(seconds: u32) -> Self {
        if seconds <= CRITICAL_THRESHOLD_SECS {
            Urgency::Critical
        } else if seconds <= WARNING_THRESHOLD_SECS {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Urgency::Normal => "",
            Urgency::Warning => "warning",
            Urgency::Critical => "critical",
        }
    }
}

pub fn format_clock(seconds: u32) -> String {
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}
