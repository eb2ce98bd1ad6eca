use anyhow::Result;
use bulkgen_client::JobEvent;
use chrono_tz::Tz;
use comfy_table::{presets::UTF8_FULL, Table};
use common::{format_timestamp, BulkJob, BulkTemplate};
use serde::Serialize;
use std::io::Write;

const BAR_WIDTH: usize = 20;

pub fn progress_bar(job: &BulkJob) -> String {
    let pct = usize::from(job.progress_percent());
    let filled = pct * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        pct
    )
}

fn actions_cell(job: &BulkJob) -> String {
    let actions: Vec<String> = job.available_actions().iter().map(ToString::to_string).collect();
    if actions.is_empty() {
        "-".to_string()
    } else {
        actions.join(", ")
    }
}

pub fn jobs_table(jobs: &[BulkJob], tz: Tz) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Type", "Status", "Progress", "Done / Failed / Total", "Created", "Actions"]);

    for job in jobs {
        table.add_row(vec![
            job.id.to_string(),
            job.job_type.clone(),
            job.status.to_string(),
            progress_bar(job),
            format!("{} / {} / {}", job.completed_items, job.failed_items, job.total_items),
            format_timestamp(&job.created_at, tz),
            actions_cell(job),
        ]);
    }
    table
}

pub fn templates_table(templates: &[BulkTemplate]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name", "Tone", "Style", "Words", "Language", "FAQ", "Conclusion"]);

    for t in templates {
        table.add_row(vec![
            t.id.clone(),
            t.name.clone(),
            t.tone.to_string(),
            t.writing_style.to_string(),
            t.word_count.to_string(),
            t.language.clone(),
            yes_no(t.include_faq).to_string(),
            yes_no(t.include_conclusion).to_string(),
        ]);
    }
    table
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

#[derive(Serialize)]
struct JobRecord<'a> {
    id: &'a str,
    job_type: &'a str,
    status: &'a str,
    total_items: u32,
    completed_items: u32,
    failed_items: u32,
    progress_percent: u8,
    created_at: String,
}

pub fn write_jobs_csv<W: Write>(jobs: &[BulkJob], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for job in jobs {
        wtr.serialize(JobRecord {
            id: &job.id.0,
            job_type: &job.job_type,
            status: job.status.as_str(),
            total_items: job.total_items,
            completed_items: job.completed_items,
            failed_items: job.failed_items,
            progress_percent: job.progress_percent(),
            created_at: job.created_at.to_rfc3339(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn event_line(event: &JobEvent) -> String {
    match event {
        JobEvent::Appeared { job } => format!("{} appeared ({})", job.id, job.status),
        JobEvent::StatusChanged { job, from } => {
            format!("{}: {} -> {} {}", job.id, from, job.status, progress_bar(job))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use common::{JobId, JobStatus};

    fn job(id: &str, status: JobStatus, completed: u32, failed: u32) -> BulkJob {
        BulkJob {
            id: JobId::from(id),
            job_type: "outline_generation".into(),
            status,
            total_items: 10,
            completed_items: completed,
            failed_items: failed,
            created_at: DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            template_id: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(&job("a", JobStatus::Pending, 0, 0)), format!("[{}]   0%", ".".repeat(20)));
        assert_eq!(
            progress_bar(&job("a", JobStatus::Processing, 4, 1)),
            format!("[{}{}]  50%", "#".repeat(10), ".".repeat(10))
        );
        assert_eq!(progress_bar(&job("a", JobStatus::Completed, 10, 0)), format!("[{}] 100%", "#".repeat(20)));
    }

    #[test]
    fn test_table_only_offers_allowed_actions() {
        let jobs = vec![
            job("done-1", JobStatus::Completed, 10, 0),
            job("run-1", JobStatus::Processing, 2, 0),
            job("part-1", JobStatus::PartiallyFailed, 7, 3),
        ];
        let rendered = jobs_table(&jobs, Tz::UTC).to_string();
        let row = |id: &str| rendered.lines().find(|l| l.contains(id)).unwrap().to_string();

        assert!(!row("done-1").contains("cancel"));
        assert!(!row("done-1").contains("retry-failed"));
        assert!(row("run-1").contains("cancel"));
        assert!(row("part-1").contains("retry-failed"));
        assert!(!row("part-1").contains("cancel"));
    }

    #[test]
    fn test_csv_export() {
        let mut out = Vec::new();
        write_jobs_csv(&[job("a", JobStatus::PartiallyFailed, 7, 3)], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,job_type,status,total_items,completed_items,failed_items,progress_percent,created_at"
        );
        assert_eq!(
            lines.next().unwrap(),
            "a,outline_generation,partially_failed,10,7,3,100,2026-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_event_line() {
        let event = JobEvent::StatusChanged {
            job: job("a", JobStatus::Completed, 10, 0),
            from: JobStatus::Processing,
        };
        assert!(event_line(&event).starts_with("a: processing -> completed"));
    }
}
