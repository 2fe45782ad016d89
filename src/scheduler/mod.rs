//! Content scheduler.
//!
//! One scheduling cycle walks every known tag in registration order. Each
//! tag gets two independent checks:
//!
//! 1. render trigger: the tag is due (or woke by button/NFC), the controller
//!    is running, storage has headroom and the sleep window is not active.
//!    The tag is then handed to the [`Dispatcher`].
//! 2. idle instruction: a tag that is checking in right now, with nothing
//!    queued for it, is told how long it may sleep.
//!
//! Tags are processed strictly one after another with a yield point between
//! them. A failure for one tag never stops the cycle.

mod invalidate;
mod sleep;

pub use sleep::SleepWindow;

use crate::clock::Clock;
use crate::config::{RunStatus, RuntimeConfig, SchedulerConfig};
use crate::dispatch::Dispatcher;
use crate::tag::{TagDb, TagRecord, WakeReason};
use chrono::{DateTime, FixedOffset};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};


/// What a scheduling cycle did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Dispatches that produced content
    pub rendered: usize,
    /// Dispatches that failed and were backed off
    pub failed: usize,
    /// Idle instructions recorded
    pub idled: usize,
    /// Unreachable tags
    pub skipped: usize,
}

/// Per-cycle driver for all tags
pub struct Scheduler {
    tags: Arc<TagDb>,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    /// Connected UI clients; tags are kept awake for them when `stop_sleep` is set
    ui_clients: AtomicUsize,
}

impl Scheduler {
    pub fn new(
        tags: Arc<TagDb>,
        dispatcher: Dispatcher,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            tags,
            dispatcher,
            clock,
            config,
            ui_clients: AtomicUsize::new(0),
        }
    }

    pub fn tags(&self) -> &Arc<TagDb> {
        &self.tags
    }

    pub fn set_ui_clients(&self, count: usize) {
        self.ui_clients.store(count, Ordering::Relaxed);
    }

    fn runtime(&self) -> RuntimeConfig {
        let runtime = &self.dispatcher.services().runtime;
        match runtime.read() {
            Ok(guard) => guard.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    /// Run one scheduling cycle over all tags
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        let runtime = self.runtime();
        if runtime.run_status == RunStatus::Stop {
            return report;
        }
        let window = SleepWindow::new(runtime.sleep_time1, runtime.sleep_time2);

        for mac in self.tags.macs() {
            let Some(tag) = self.tags.get(&mac) else {
                continue;
            };
            if !tag.is_reachable() {
                report.skipped += 1;
                continue;
            }

            let now = self.clock.now();
            if self.should_render(&tag, &runtime, &window, &now) {
                self.render(tag, &now, &mut report).await;
            }

            // Re-read: the dispatch and transport callbacks may have moved things
            if let Some(tag) = self.tags.get(&mac) {
                let now = self.clock.now();
                if self.issue_idle(&tag, &runtime, &window, &now) {
                    report.idled += 1;
                }
            }

            tokio::task::yield_now().await;
        }

        if report.rendered + report.failed > 0 {
            debug!(
                rendered = report.rendered,
                failed = report.failed,
                idled = report.idled,
                "Scheduling cycle complete"
            );
        }
        report
    }

    fn should_render(
        &self,
        tag: &TagRecord,
        runtime: &RuntimeConfig,
        window: &SleepWindow,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        let due = now.timestamp() >= tag.next_update || tag.wake_reason.forces_render();
        if !due || runtime.run_status != RunStatus::Run {
            return false;
        }
        let free = self.dispatcher.services().store.free_space();
        if free <= self.config.storage_headroom_bytes {
            debug!(mac = %tag.mac, free, "Storage headroom exhausted, render deferred");
            return false;
        }
        !window.contains(now)
    }

    async fn render(
        &self,
        mut tag: TagRecord,
        now: &DateTime<FixedOffset>,
        report: &mut CycleReport,
    ) {
        let consumed = tag.wake_reason;
        let button_pressed = consumed == WakeReason::Gpio;
        let mode = tag.content_mode;

        match self.dispatcher.dispatch(&mut tag, button_pressed, *now).await {
            Ok(()) => report.rendered += 1,
            Err(e) => {
                warn!(
                    mac = %tag.mac,
                    mode,
                    next_update = tag.next_update,
                    error = %e,
                    "Render failed"
                );
                report.failed += 1;
            }
        }
        self.tags.apply_dispatch(&tag, consumed);
    }

    /// Minutes the tag may sleep, or `None` when it should not be idled
    fn idle_minutes(
        &self,
        tag: &TagRecord,
        runtime: &RuntimeConfig,
        window: &SleepWindow,
        now: &DateTime<FixedOffset>,
    ) -> Option<u16> {
        let ts = now.timestamp();
        let checkin = tag.expected_next_checkin;
        let checking_in = checkin >= ts - self.config.checkin_lead_seconds
            && checkin < ts + self.config.checkin_lag_seconds;
        if !checking_in || tag.pending_idle != 0 || tag.pending {
            return None;
        }

        let minutes = if window.contains(now) {
            window.minutes_to_end(now)
        } else {
            (i64::from(runtime.max_sleep)).min((tag.next_update - ts) / 60)
        };
        if minutes <= 1 {
            return None;
        }
        if runtime.stop_sleep && self.ui_clients.load(Ordering::Relaxed) > 0 {
            return None;
        }
        Some(minutes.min(i64::from(u16::MAX)) as u16)
    }

    fn issue_idle(
        &self,
        tag: &TagRecord,
        runtime: &RuntimeConfig,
        window: &SleepWindow,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        let Some(minutes) = self.idle_minutes(tag, runtime, window, now) else {
            return false;
        };
        self.tags.set_pending_idle(&tag.mac, minutes);
        if !tag.is_external {
            self.dispatcher
                .services()
                .transport
                .send_idle(&tag.mac, minutes);
        }
        debug!(mac = %tag.mac, minutes, "Idle instruction issued");
        true
    }

    /// Run scheduling cycles and variable checks until the task is cancelled
    pub async fn run(&self) {
        let period = Duration::from_secs(self.config.cycle_interval_seconds.max(1));
        info!(
            interval_seconds = period.as_secs(),
            tags = self.tags.len(),
            "Starting content scheduler"
        );

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            self.run_cycle().await;
            self.check_vars();
        }
    }
}
