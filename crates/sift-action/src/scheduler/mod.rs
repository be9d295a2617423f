//! Cron scheduler for time-triggered handlers.
//!
//! Holds one [`CronJob`] per registered handler spec and hands due specs to
//! a [`SpecExecutor`] (the orchestrator). The background loop wakes every
//! tick, runs whatever is due, and returns on shutdown.

mod cron;

pub use self::cron::{parse_schedule, JobTimezone};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sift_core::types::HandlerSpec;
use tokio::sync::Notify;

use crate::error::SchedulerError;

/// Runs one spec on behalf of the scheduler and describes the result.
#[async_trait]
pub trait SpecExecutor: Send + Sync {
    async fn execute_spec(&self, spec: HandlerSpec) -> String;
}

/// Scheduler bookkeeping for one job.
#[derive(Debug, Clone)]
pub struct CronJob {
    pub job_id: String,
    pub cron_expression: String,
    pub timezone: JobTimezone,
    pub spec: HandlerSpec,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub last_result: Option<String>,
    schedule: ::cron::Schedule,
}

impl CronJob {
    fn refresh_next_run(&mut self, after: DateTime<Utc>) {
        self.next_run = if self.enabled {
            self.timezone.next_after(&self.schedule, after)
        } else {
            None
        };
    }
}

fn due_ids(jobs: &HashMap<String, CronJob>, now: DateTime<Utc>) -> Vec<String> {
    let mut due: Vec<String> = jobs
        .values()
        .filter(|job| job.enabled && job.next_run.is_some_and(|next| next <= now))
        .map(|job| job.job_id.clone())
        .collect();
    due.sort();
    due
}

/// Background scheduler that fires due cron jobs.
pub struct CronScheduler {
    jobs: Mutex<HashMap<String, CronJob>>,
    executor: Arc<dyn SpecExecutor>,
    shutdown: Arc<Notify>,
    tick: Duration,
}

impl CronScheduler {
    pub fn new(executor: Arc<dyn SpecExecutor>, tick: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            executor,
            shutdown: Arc::new(Notify::new()),
            tick: tick.max(Duration::from_millis(10)),
        }
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<String, CronJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register (or replace) a job, reporting why it was refused.
    pub fn try_register_job(
        &self,
        job_id: &str,
        cron_expression: &str,
        spec: HandlerSpec,
        timezone: Option<&str>,
    ) -> Result<(), SchedulerError> {
        let schedule = parse_schedule(cron_expression)?;
        let timezone: JobTimezone = timezone.unwrap_or("").parse()?;
        let mut job = CronJob {
            job_id: job_id.to_string(),
            cron_expression: cron_expression.trim().to_string(),
            timezone,
            enabled: spec.cron_enabled,
            spec,
            last_run: None,
            next_run: None,
            run_count: 0,
            last_result: None,
            schedule,
        };
        job.refresh_next_run(Utc::now());

        tracing::info!(
            job_id = %job_id,
            expression = %job.cron_expression,
            timezone = %job.timezone,
            next_run = ?job.next_run,
            "Cron job registered"
        );
        if self.lock_jobs().insert(job_id.to_string(), job).is_some() {
            tracing::warn!(job_id = %job_id, "Cron job replaced");
        }
        Ok(())
    }

    /// Register a job. Returns false when the expression or timezone is invalid.
    pub fn register_job(
        &self,
        job_id: &str,
        cron_expression: &str,
        spec: HandlerSpec,
        timezone: Option<&str>,
    ) -> bool {
        match self.try_register_job(job_id, cron_expression, spec, timezone) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Cron job rejected");
                false
            }
        }
    }

    /// Run a job now, regardless of its schedule or enabled flag.
    pub async fn trigger_job(&self, job_id: &str) -> bool {
        let spec = match self.lock_jobs().get(job_id) {
            Some(job) => job.spec.clone(),
            None => {
                tracing::warn!(job_id = %job_id, "Trigger for unknown cron job");
                return false;
            }
        };
        self.run_job(job_id, spec).await;
        true
    }

    pub fn set_job_enabled(&self, job_id: &str, enabled: bool) -> bool {
        let mut jobs = self.lock_jobs();
        match jobs.get_mut(job_id) {
            Some(job) => {
                job.enabled = enabled;
                job.refresh_next_run(Utc::now());
                tracing::info!(job_id = %job_id, enabled, "Cron job toggled");
                true
            }
            None => false,
        }
    }

    /// Snapshot of every job, sorted by id.
    pub fn jobs(&self) -> Vec<CronJob> {
        let mut jobs: Vec<CronJob> = self.lock_jobs().values().cloned().collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        jobs
    }

    pub fn get(&self, job_id: &str) -> Option<CronJob> {
        self.lock_jobs().get(job_id).cloned()
    }

    /// Enabled jobs whose next run is at or before `now`, sorted by id.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<String> {
        due_ids(&self.lock_jobs(), now)
    }

    /// Fire every job due at `now`. Returns how many ran.
    pub async fn run_due(&self, now: DateTime<Utc>) -> usize {
        let mut fired = Vec::new();
        {
            let mut jobs = self.lock_jobs();
            for job_id in due_ids(&jobs, now) {
                if let Some(job) = jobs.get_mut(&job_id) {
                    job.refresh_next_run(now);
                    fired.push((job_id, job.spec.clone()));
                }
            }
        }
        let count = fired.len();
        for (job_id, spec) in fired {
            self.run_job(&job_id, spec).await;
        }
        count
    }

    async fn run_job(&self, job_id: &str, spec: HandlerSpec) {
        let started = Utc::now();
        let result = self.executor.execute_spec(spec).await;
        tracing::info!(job_id = %job_id, result = %result, "Cron job ran");

        if let Some(job) = self.lock_jobs().get_mut(job_id) {
            job.last_run = Some(started);
            job.run_count += 1;
            job.last_result = Some(result);
        }
    }

    /// Tick loop. Returns on shutdown signal.
    pub async fn run(&self) {
        tracing::info!(tick_ms = self.tick.as_millis() as u64, "Cron scheduler started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {
                    self.run_due(Utc::now()).await;
                }
                _ = self.shutdown.notified() => {
                    tracing::info!("Cron scheduler stopped");
                    return;
                }
            }
        }
    }

    /// Signal the scheduler to shut down gracefully.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}
