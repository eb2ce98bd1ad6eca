use common::{any_active, BulkJob, JobId, JobStatus, Page};

/// Latest job snapshot held by a mounted board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobListState {
    pub jobs: Vec<BulkJob>,
    pub total: u64,
    pub pages: u32,
    /// Whether the poller should keep refreshing.
    pub active: bool,
    /// Bumped on every accepted update.
    pub revision: u64,
    applied_ticket: u64,
}

impl JobListState {
    /// Replace the held list and recompute the active flag.
    pub fn set_jobs(&mut self, jobs: Vec<BulkJob>) {
        for job in jobs.iter().filter(|job| !job.counters_consistent()) {
            log::warn!(
                "Job {} reports {} completed + {} failed of {} items",
                job.id, job.completed_items, job.failed_items, job.total_items
            );
        }
        self.active = any_active(&jobs);
        self.jobs = jobs;
        self.revision += 1;
    }

    /// Force polling back on until the next snapshot says otherwise.
    pub fn arm(&mut self) {
        self.active = true;
        self.revision += 1;
    }

    pub fn should_poll(&self) -> bool {
        self.active && !self.jobs.is_empty()
    }

    /// Apply a fetched page unless a later-issued fetch was already applied.
    ///
    /// Tickets are taken when a request starts, so a slow poll that resolves
    /// after a newer reload cannot overwrite the newer data. Returns whether
    /// the page was applied.
    pub fn apply_page(&mut self, ticket: u64, page: Page<BulkJob>) -> bool {
        if ticket < self.applied_ticket {
            log::debug!(
                "Discarding stale job list (ticket {} < {})",
                ticket, self.applied_ticket
            );
            return false;
        }
        self.applied_ticket = ticket;
        self.total = page.total;
        self.pages = page.pages;
        self.set_jobs(page.items);
        true
    }

    pub fn find(&self, id: &JobId) -> Option<&BulkJob> {
        self.jobs.iter().find(|job| &job.id == id)
    }
}

/// A status change observed between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Appeared { job: BulkJob },
    StatusChanged { job: BulkJob, from: JobStatus },
}

impl JobEvent {
    pub fn job(&self) -> &BulkJob {
        match self {
            JobEvent::Appeared { job } | JobEvent::StatusChanged { job, .. } => job,
        }
    }
}

/// Status transitions between `prev` and `next`. Jobs that drop out of the
/// page are not reported.
pub fn diff_snapshots(prev: &JobListState, next: &JobListState) -> Vec<JobEvent> {
    next.jobs
        .iter()
        .filter_map(|job| match prev.find(&job.id) {
            None => Some(JobEvent::Appeared { job: job.clone() }),
            Some(old) if old.status != job.status => Some(JobEvent::StatusChanged {
                job: job.clone(),
                from: old.status,
            }),
            Some(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::job;

    fn page(jobs: Vec<BulkJob>) -> Page<BulkJob> {
        let total = jobs.len() as u64;
        Page { items: jobs, total, pages: 1 }
    }

    #[test]
    fn test_set_jobs_recomputes_active() {
        let mut state = JobListState::default();
        state.set_jobs(vec![job("a", JobStatus::Completed), job("b", JobStatus::Processing)]);
        assert!(state.active);
        assert!(state.should_poll());

        state.set_jobs(vec![job("a", JobStatus::Completed), job("b", JobStatus::Cancelled)]);
        assert!(!state.active);
        assert!(!state.should_poll());
    }

    #[test]
    fn test_armed_empty_list_does_not_poll() {
        let mut state = JobListState::default();
        state.arm();
        assert!(state.active);
        assert!(!state.should_poll());
    }

    #[test]
    fn test_arm_is_overridden_by_next_snapshot() {
        let mut state = JobListState::default();
        state.set_jobs(vec![job("a", JobStatus::Failed)]);
        state.arm();
        assert!(state.should_poll());

        state.set_jobs(vec![job("a", JobStatus::Failed)]);
        assert!(!state.should_poll());
    }

    #[test]
    fn test_stale_page_discarded() {
        let mut state = JobListState::default();
        assert!(state.apply_page(2, page(vec![job("a", JobStatus::Completed)])));
        assert!(!state.apply_page(1, page(vec![job("a", JobStatus::Processing)])));
        assert_eq!(state.jobs[0].status, JobStatus::Completed);
        assert!(!state.active);
        assert!(state.apply_page(3, page(vec![job("a", JobStatus::Processing)])));
        assert_eq!(state.revision, 2);
    }

    #[test]
    fn test_diff_reports_transitions() {
        let mut prev = JobListState::default();
        prev.set_jobs(vec![job("a", JobStatus::Processing), job("b", JobStatus::Pending)]);
        let mut next = JobListState::default();
        next.set_jobs(vec![
            job("a", JobStatus::Completed),
            job("b", JobStatus::Pending),
            job("c", JobStatus::Pending),
        ]);

        let events = diff_snapshots(&prev, &next);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            JobEvent::StatusChanged { job, from: JobStatus::Processing } if job.status == JobStatus::Completed
        ));
        assert!(matches!(&events[1], JobEvent::Appeared { job } if job.id == JobId::from("c")));
    }
}
