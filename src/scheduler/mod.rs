//! Daily solar schedule and the loop that fires it.
//!
//! Once a day (at startup, then at `refresh_at`) [`DailyScheduler`] resolves
//! today's solar times, derives the door and lighting jobs and swaps them into
//! the [`Timeline`]. The refresh itself is a job on the same timeline, so a
//! single thread services everything in fire-time order.
//!
//! Jobs run on the scheduler thread with the timeline unlocked. A job that
//! panics is reported and dropped; the loop and the refresh job carry on.
//!
//! Each command fires at most once per local date. A reinstall later in the
//! same day (the refresh, when `refresh_at` falls after sunrise) leaves out
//! whatever already ran, so the past-due policy only ever applies to jobs
//! that have not fired yet.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

pub mod plan;
pub mod timeline;

pub use plan::{PlanSettings, PlannedJob, derive_plan, supplemental_light_minutes};
pub use timeline::{JobAction, ScheduledJob, Timeline};

use crate::actuator::{Command, CommandSink};
use crate::common::constants::SCHEDULER_POLL_INTERVAL;
use crate::common::utils::local_datetime;
use crate::config::{Config, PastDuePolicy};
use crate::event_log::EventLog;
use crate::geo::{SolarTimeResolver, SolarTimes};
use crate::time_source::TimeSource;


pub struct DailyScheduler {
    resolver: Arc<SolarTimeResolver>,
    sink: Arc<dyn CommandSink>,
    events: Arc<EventLog>,
    clock: Arc<dyn TimeSource>,
    settings: PlanSettings,
    refresh_at: NaiveTime,
    past_due: PastDuePolicy,
    timeline: Mutex<Timeline>,
    wakeup: Condvar,
    last_times: Mutex<Option<SolarTimes>>,
    /// Commands already fired, keyed by the local date they were planned for.
    fired: Mutex<HashSet<(Command, NaiveDate)>>,
}

impl DailyScheduler {
    pub fn new(
        config: &Config,
        resolver: Arc<SolarTimeResolver>,
        sink: Arc<dyn CommandSink>,
        events: Arc<EventLog>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            resolver,
            sink,
            events,
            clock,
            settings: PlanSettings::from_config(config),
            refresh_at: config.refresh_at(),
            past_due: config.past_due(),
            timeline: Mutex::new(Timeline::new()),
            wakeup: Condvar::new(),
            last_times: Mutex::new(None),
            fired: Mutex::new(HashSet::new()),
        }
    }

    fn timeline(&self) -> MutexGuard<'_, Timeline> {
        match self.timeline.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn fired(&self) -> MutexGuard<'_, HashSet<(Command, NaiveDate)>> {
        match self.fired.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Resolve today's solar times and replace the pending door and lighting
    /// jobs with the ones derived from them.
    ///
    /// Safe to call repeatedly: the refresh job is kept, every other pending
    /// job is superseded, and jobs that already fired today are not
    /// installed again.
    pub fn install_today_schedule(&self) -> SolarTimes {
        let tz = self.resolver.timezone();
        let now = self.clock.now();
        let today = now.with_timezone(&tz).date_naive();

        let times = self.resolver.resolve_day(today);
        self.events.record(&format!(
            "solar times for {today}: sunrise {} ({}), dusk {} ({}), sunset {} ({})",
            times.sunrise.at.format("%H:%M"),
            times.sunrise.provenance.as_str(),
            times.dusk.at.format("%H:%M"),
            times.dusk.provenance.as_str(),
            times.sunset.at.format("%H:%M"),
            times.sunset.provenance.as_str(),
        ));

        let mut plan = derive_plan(&times, &self.settings);
        let mut already_ran = Vec::new();
        {
            let mut fired = self.fired();
            fired.retain(|&(_, date)| date >= today);
            plan.retain(|planned| {
                let ran = fired.contains(&(planned.command, planned.fire_at.date_naive()));
                if ran {
                    already_ran.push(planned.command);
                }
                !ran
            });
        }

        let mut skipped = Vec::new();
        {
            let mut timeline = self.timeline();
            timeline.retain(|job| !job.is_solar());
            for planned in plan {
                if planned.fire_at.with_timezone(&Utc) <= now
                    && self.past_due == PastDuePolicy::Skip
                {
                    skipped.push(planned);
                    continue;
                }
                timeline.push(ScheduledJob::actuate(planned.command, planned.fire_at));
            }
        }

        for command in already_ran {
            self.events
                .record(&format!("already ran today - not rescheduled {}", command.label()));
        }
        for planned in skipped {
            self.events.record(&format!(
                "past due - not scheduled {} ({})",
                planned.command.label(),
                planned.fire_at.format("%H:%M")
            ));
        }

        if let Ok(mut last) = self.last_times.lock() {
            *last = Some(times);
        }
        self.log_schedule("add_events");
        self.wakeup.notify_all();
        times
    }

    /// Schedule the next refresh at the first `refresh_at` after now.
    pub fn arm_refresh(&self) -> DateTime<chrono_tz::Tz> {
        let tz = self.resolver.timezone();
        let now = self.clock.now();
        let today = now.with_timezone(&tz).date_naive();

        let mut next = local_datetime(&tz, today, self.refresh_at);
        if next.with_timezone(&Utc) <= now {
            next = local_datetime(&tz, today + Duration::days(1), self.refresh_at);
        }

        {
            let mut timeline = self.timeline();
            timeline.retain(|job| job.is_solar());
            timeline.push(ScheduledJob::refresh(next));
        }
        self.wakeup.notify_all();
        next
    }

    /// Write a heading and every pending job to the event log.
    pub fn log_schedule(&self, heading: &str) {
        self.events.record(heading);
        for job in self.pending_jobs() {
            self.events.record(&format!("scheduled - {job}"));
        }
    }

    pub fn pending_jobs(&self) -> Vec<ScheduledJob> {
        self.timeline().pending()
    }

    /// Solar times used by the most recent install.
    pub fn last_solar_times(&self) -> Option<SolarTimes> {
        self.last_times.lock().ok().and_then(|last| *last)
    }

    pub fn resolver(&self) -> &Arc<SolarTimeResolver> {
        &self.resolver
    }

    /// Fire every job that is due. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut fired = 0;
        loop {
            let now = self.clock.now();
            let Some(job) = self.timeline().pop_due(now) else {
                break;
            };
            self.execute(job);
            fired += 1;
        }
        fired
    }

    fn execute(&self, job: ScheduledJob) {
        if let JobAction::Actuate(command) = job.action {
            self.fired().insert((command, job.fire_at.date_naive()));
        }
        let result = catch_unwind(AssertUnwindSafe(|| match job.action {
            JobAction::Actuate(command) => {
                self.sink.execute(command);
            }
            JobAction::Refresh => {
                self.install_today_schedule();
                self.arm_refresh();
            }
        }));

        if let Err(panic) = result {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log_critical!("Job '{}' panicked: {reason}", job.label);
            self.events
                .record(&format!("job {} failed - {reason}", job.label));
            // A refresh that dies must still come back tomorrow
            if job.action == JobAction::Refresh {
                self.arm_refresh();
            }
        }
    }

    /// Service the timeline until `running` is cleared.
    pub fn run(&self, running: &AtomicBool) {
        while running.load(Ordering::SeqCst) {
            self.run_pending();

            let timeline = self.timeline();
            let wait = match timeline.next_fire() {
                Some(next) => (next - self.clock.now())
                    .to_std()
                    .unwrap_or_default()
                    .min(SCHEDULER_POLL_INTERVAL),
                None => SCHEDULER_POLL_INTERVAL,
            };
            let _ = self.wakeup.wait_timeout(timeline, wait);
        }
    }
}
