//! In-memory stand-in for the bulk API used by unit tests.

use crate::api::BulkApi;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use common::{
    BulkJob, BulkTemplate, CreateOutlineJobRequest, JobId, JobStatus, Page, PageQuery,
    TemplateDraft,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn job(id: &str, status: JobStatus) -> BulkJob {
    BulkJob {
        id: JobId::from(id),
        job_type: "outline_generation".to_string(),
        status,
        total_items: 10,
        completed_items: 0,
        failed_items: 0,
        created_at: DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
        template_id: None,
        updated_at: None,
    }
}

#[derive(Default)]
struct Inner {
    jobs: Mutex<Vec<BulkJob>>,
    last_keywords: Mutex<Vec<String>>,
    list_delay: Mutex<Duration>,
    command_delay: Mutex<Duration>,
    fail_lists: AtomicBool,
    fail_commands: AtomicBool,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    retry_calls: AtomicUsize,
}

/// Behaves like the server: cancel and retry change the stored job status.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Inner>,
}

fn server_error() -> Error {
    Error::Api {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

impl FakeApi {
    pub fn with_jobs(jobs: Vec<BulkJob>) -> Self {
        let api = FakeApi::default();
        *api.inner.jobs.lock().unwrap() = jobs;
        api
    }

    pub fn set_status(&self, id: &str, status: JobStatus) {
        let mut jobs = self.inner.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.id.0 == id) {
            job.status = status;
        }
    }

    pub fn set_list_delay(&self, delay: Duration) {
        *self.inner.list_delay.lock().unwrap() = delay;
    }

    pub fn set_command_delay(&self, delay: Duration) {
        *self.inner.command_delay.lock().unwrap() = delay;
    }

    pub fn fail_lists(&self, fail: bool) {
        self.inner.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commands(&self, fail: bool) {
        self.inner.fail_commands.store(fail, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.inner.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.inner.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn retry_calls(&self) -> usize {
        self.inner.retry_calls.load(Ordering::SeqCst)
    }

    pub fn last_keywords(&self) -> Vec<String> {
        self.inner.last_keywords.lock().unwrap().clone()
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn command(&self, id: &JobId, status: JobStatus) -> Result<()> {
        let delay = *self.inner.command_delay.lock().unwrap();
        Self::pause(delay).await;
        if self.inner.fail_commands.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        self.set_status(&id.0, status);
        Ok(())
    }
}

impl BulkApi for FakeApi {
    async fn list_jobs(&self, _query: PageQuery) -> Result<Page<BulkJob>> {
        self.inner.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.inner.list_delay.lock().unwrap();
        Self::pause(delay).await;
        if self.inner.fail_lists.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        let items = self.inner.jobs.lock().unwrap().clone();
        let total = items.len() as u64;
        Ok(Page { items, total, pages: 1 })
    }

    async fn create_outline_job(&self, request: &CreateOutlineJobRequest) -> Result<BulkJob> {
        let n = self.inner.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.inner.fail_commands.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        *self.inner.last_keywords.lock().unwrap() =
            request.keywords.iter().map(|k| k.keyword.clone()).collect();

        let mut created = job(&format!("created-{}", n), JobStatus::Pending);
        created.total_items = request.keywords.len() as u32;
        created.template_id = request.template_id.clone();
        self.inner.jobs.lock().unwrap().insert(0, created.clone());
        Ok(created)
    }

    async fn cancel_job(&self, id: &JobId) -> Result<()> {
        self.inner.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.command(id, JobStatus::Cancelled).await
    }

    async fn retry_failed(&self, id: &JobId) -> Result<()> {
        self.inner.retry_calls.fetch_add(1, Ordering::SeqCst);
        self.command(id, JobStatus::Pending).await
    }

    async fn list_templates(&self) -> Result<Vec<BulkTemplate>> {
        Ok(Vec::new())
    }

    async fn create_template(&self, draft: &TemplateDraft) -> Result<BulkTemplate> {
        Ok(BulkTemplate {
            id: "tpl-1".to_string(),
            name: draft.name.clone(),
            tone: draft.tone,
            writing_style: draft.writing_style,
            word_count: draft.word_count,
            language: draft.language.clone(),
            include_faq: draft.include_faq,
            include_conclusion: draft.include_conclusion,
            created_at: None,
        })
    }

    async fn update_template(&self, id: &str, draft: &TemplateDraft) -> Result<BulkTemplate> {
        let mut template = self.create_template(draft).await?;
        template.id = id.to_string();
        Ok(template)
    }

    async fn delete_template(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}
