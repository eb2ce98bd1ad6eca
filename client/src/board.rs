//! A mounted view over the bulk job list.
//!
//! [`JobBoard`] owns the job snapshot, the background poller that refreshes
//! it while any job is still running, and the per-job commands. All of it is
//! tied to one cancellation token: dropping or unmounting the board stops
//! the poller and abandons in-flight requests, so no update lands after
//! teardown.

use crate::api::BulkApi;
use crate::backoff::{calculate_backoff_delay, BackoffStrategy};
use crate::config::PollerConfig;
use crate::error::{Error, Result};
use crate::state::JobListState;
use common::{build_outline_request, BulkJob, JobAction, JobId, PageQuery};
use dashmap::DashSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub backoff: BackoffStrategy,
    pub query: PageQuery,
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig::from(&PollerConfig::default())
    }
}

impl From<&PollerConfig> for BoardConfig {
    fn from(config: &PollerConfig) -> Self {
        Self {
            poll_interval: config.interval(),
            max_poll_interval: config.max_interval(),
            backoff: config.backoff,
            query: PageQuery {
                page: 1,
                page_size: config.page_size,
            },
        }
    }
}

/// User-triggered request kinds; at most one of each may be in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Submit,
    Job(JobId, JobAction),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Submit => f.write_str("submit"),
            Command::Job(id, action) => write!(f, "{} for job {}", action, id),
        }
    }
}

struct Shared<A> {
    api: A,
    config: BoardConfig,
    state: watch::Sender<JobListState>,
    tickets: AtomicU64,
    in_flight: DashSet<Command>,
    cancel: CancellationToken,
}

impl<A: BulkApi> Shared<A> {
    /// Race `fut` against teardown.
    async fn cancellable<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }

    /// Fetch the configured page and apply it. Returns whether the page was
    /// newer than what the state already holds.
    async fn fetch(&self) -> Result<bool> {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let page = self.cancellable(self.api.list_jobs(self.config.query)).await?;
        Ok(self.state.send_if_modified(|state| state.apply_page(ticket, page)))
    }

    fn arm(&self) {
        self.state.send_modify(JobListState::arm);
    }

    fn begin(&self, command: Command) -> Result<InFlight<'_>> {
        if !self.in_flight.insert(command.clone()) {
            return Err(Error::ActionInFlight(command.to_string()));
        }
        Ok(InFlight { set: &self.in_flight, command })
    }
}

/// Releases its command slot on every exit path.
struct InFlight<'a> {
    set: &'a DashSet<Command>,
    command: Command,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.command);
    }
}

pub struct JobBoard<A: BulkApi + 'static> {
    shared: Arc<Shared<A>>,
    poller: Option<JoinHandle<()>>,
}

impl<A: BulkApi + 'static> JobBoard<A> {
    /// Load the first page and start the poller.
    pub async fn mount(api: A, config: BoardConfig) -> Result<Self> {
        let (state, _) = watch::channel(JobListState::default());
        let shared = Arc::new(Shared {
            api,
            config,
            state,
            tickets: AtomicU64::new(0),
            in_flight: DashSet::new(),
            cancel: CancellationToken::new(),
        });

        shared.fetch().await?;
        log::debug!(
            "Job board mounted with {} jobs",
            shared.state.borrow().jobs.len()
        );

        let rx = shared.state.subscribe();
        let poller = tokio::spawn(run_poller(shared.clone(), rx));

        Ok(Self {
            shared,
            poller: Some(poller),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<JobListState> {
        self.shared.state.subscribe()
    }

    pub fn snapshot(&self) -> JobListState {
        self.shared.state.borrow().clone()
    }

    pub fn is_busy(&self, command: &Command) -> bool {
        self.shared.in_flight.contains(command)
    }

    /// User-triggered refresh. Unlike poll ticks, failures are returned.
    pub async fn reload(&self) -> Result<()> {
        self.shared.fetch().await.map(|_| ())
    }

    /// Validate the keyword text, create the outline job and start polling.
    pub async fn submit(&self, keywords_text: &str, template_id: Option<String>) -> Result<BulkJob> {
        let request = build_outline_request(keywords_text, template_id)?;
        let _guard = self.shared.begin(Command::Submit)?;

        let job = self
            .shared
            .cancellable(self.shared.api.create_outline_job(&request))
            .await?;
        log::info!(
            "Created job {} with {} keywords",
            job.id,
            request.keywords.len()
        );

        self.shared.arm();
        self.refresh_after(&Command::Submit).await?;
        Ok(job)
    }

    pub async fn cancel(&self, id: &JobId) -> Result<()> {
        self.run_job_command(id, JobAction::Cancel).await
    }

    pub async fn retry_failed(&self, id: &JobId) -> Result<()> {
        self.run_job_command(id, JobAction::RetryFailed).await
    }

    async fn run_job_command(&self, id: &JobId, action: JobAction) -> Result<()> {
        {
            let state = self.shared.state.borrow();
            let job = state.find(id).ok_or_else(|| Error::JobNotFound(id.clone()))?;
            if !job.allows(action) {
                return Err(Error::ActionNotAllowed {
                    job_id: id.clone(),
                    action,
                    status: job.status,
                });
            }
        }

        let command = Command::Job(id.clone(), action);
        let _guard = self.shared.begin(command.clone())?;

        let request = async {
            match action {
                JobAction::Cancel => self.shared.api.cancel_job(id).await,
                JobAction::RetryFailed => self.shared.api.retry_failed(id).await,
            }
        };
        self.shared.cancellable(request).await?;
        log::info!("Requested {}", command);

        if action == JobAction::RetryFailed {
            self.shared.arm();
        }
        self.refresh_after(&command).await
    }

    /// Reload after a successful command. The command itself went through, so
    /// a failed reload is only logged; the poller picks up from there.
    async fn refresh_after(&self, command: &Command) -> Result<()> {
        match self.shared.fetch().await {
            Ok(_) => Ok(()),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                log::warn!("Reload after {} failed: {}", command, e);
                Ok(())
            }
        }
    }

    /// Stop the poller and wait for it to exit.
    pub async fn unmount(mut self) {
        self.shared.cancel.cancel();
        if let Some(handle) = self.poller.take() {
            if let Err(e) = handle.await {
                log::error!("Poller task ended abnormally: {}", e);
            }
        }
        log::debug!("Job board unmounted");
    }
}

impl<A: BulkApi + 'static> Drop for JobBoard<A> {
    fn drop(&mut self) {
        self.shared.cancel.cancel();
    }
}

async fn run_poller<A: BulkApi>(shared: Arc<Shared<A>>, mut rx: watch::Receiver<JobListState>) {
    let config = &shared.config;
    let mut failures: u32 = 0;

    loop {
        let should_poll = rx.borrow_and_update().should_poll();
        if !should_poll {
            log::debug!("No active jobs, poller idle");
            tokio::select! {
                _ = shared.cancel.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let delay = calculate_backoff_delay(
            failures,
            config.backoff,
            config.poll_interval,
            config.max_poll_interval,
        );
        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            // A reload or re-arm restarts the wait from the new state
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        match shared.fetch().await {
            Ok(_) => failures = 0,
            Err(Error::Cancelled) => break,
            Err(e) => {
                failures = failures.saturating_add(1);
                log::debug!("Poll failed ({} in a row), keeping last snapshot: {}", failures, e);
            }
        }
    }

    log::debug!("Poller stopped");
}
