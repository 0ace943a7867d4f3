// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded polling of spooler jobs for synchronous submissions.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use printgate_core::config::AppConfig;
use printgate_core::error::{PrintgateError, Result};
use printgate_core::types::PrintJob;

/// How long and how often a synchronous submission checks on its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before the second check. Fast jobs finish within it.
    pub initial_delay: Duration,
    /// Delay between later checks.
    pub interval: Duration,
    /// Total wait budget. Kept below common 30 s proxy timeouts.
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(25),
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            initial_delay: config.poll_initial_delay(),
            interval: config.poll_interval(),
            max_wait: config.poll_max_wait(),
        }
    }
}

/// Fetch a job until it leaves `pending`/`processing` or the budget runs out.
///
/// Returns the last snapshot seen, which may still be non-terminal. An async
/// submission gets the first snapshot without any sleeping. A job that
/// disappears mid-wait is an error because the spooler just handed us its id.
pub async fn wait_for_job<F, Fut>(
    job_id: &str,
    is_async: bool,
    policy: &PollPolicy,
    mut fetch: F,
) -> Result<PrintJob>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<PrintJob>>>,
{
    let started = Instant::now();
    let mut delay = policy.initial_delay;
    loop {
        let job = fetch().await?.ok_or_else(|| {
            PrintgateError::Spooler("Failed to get job attributes from CUPS".into())
        })?;

        let waited = started.elapsed();
        if is_async || waited + delay > policy.max_wait || !job.job_state.is_pending_or_processing()
        {
            debug!(
                job_id,
                state = job.job_state.as_str(),
                waited_ms = waited.as_millis() as u64,
                "Stopped polling"
            );
            return Ok(job);
        }

        sleep(delay).await;
        delay = policy.interval;
    }
}
