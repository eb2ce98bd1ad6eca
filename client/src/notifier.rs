use crate::state::JobEvent;
use anyhow::Result;
use common::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A short, transient message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    /// Completion and failure transitions are worth telling the user about;
    /// progress in between is not.
    pub fn for_event(event: &JobEvent) -> Option<Self> {
        let JobEvent::StatusChanged { job, .. } = event else {
            return None;
        };
        let title = format!("Job {}", job.id);
        match job.status {
            JobStatus::Completed => Some(Notice::success(
                title,
                format!("{} of {} items completed", job.completed_items, job.total_items),
            )),
            JobStatus::PartiallyFailed => Some(Notice::error(
                title,
                format!(
                    "{} of {} items failed; failed items can be retried",
                    job.failed_items, job.total_items
                ),
            )),
            JobStatus::Failed => Some(Notice::error(title, "Job failed")),
            JobStatus::Cancelled => Some(Notice::new(NoticeLevel::Info, title, "Job cancelled")),
            JobStatus::Pending | JobStatus::Processing => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationChannel {
    Terminal,
    Webhook {
        url: String,
        #[serde(default)]
        headers: Option<HashMap<String, String>>,
    },
    Slack {
        webhook_url: String,
    },
    Discord {
        webhook_url: String,
    },
}

pub struct Notifier {
    client: reqwest::Client,
    channels: Vec<NotificationChannel>,
}

impl Notifier {
    pub fn new(channels: Vec<NotificationChannel>) -> Self {
        Self {
            client: reqwest::Client::new(),
            channels,
        }
    }

    /// Terminal toasts plus whatever channels are configured.
    pub fn with_terminal(mut channels: Vec<NotificationChannel>) -> Self {
        if !channels.contains(&NotificationChannel::Terminal) {
            channels.insert(0, NotificationChannel::Terminal);
        }
        Self::new(channels)
    }

    pub fn channels(&self) -> &[NotificationChannel] {
        &self.channels
    }

    /// Deliver to every channel. Delivery failures are logged only.
    pub async fn notify(&self, notice: &Notice) {
        for channel in &self.channels {
            if let Err(e) = self.send_notification(notice, channel).await {
                log::error!("Failed to send notification via {:?}: {}", channel, e);
            }
        }
    }

    /// Surface a failed user action immediately.
    pub async fn toast_error(&self, title: &str, err: &dyn std::fmt::Display) {
        self.notify(&Notice::error(title, err.to_string())).await;
    }

    async fn send_notification(&self, notice: &Notice, channel: &NotificationChannel) -> Result<()> {
        match channel {
            NotificationChannel::Terminal => {
                eprintln!("{}", render_toast(notice));
                Ok(())
            }
            NotificationChannel::Webhook { url, headers } => {
                self.send_webhook(notice, url, headers.as_ref()).await
            }
            NotificationChannel::Slack { webhook_url } => self.send_slack(notice, webhook_url).await,
            NotificationChannel::Discord { webhook_url } => {
                self.send_discord(notice, webhook_url).await
            }
        }
    }

    async fn send_webhook(
        &self,
        notice: &Notice,
        url: &str,
        headers: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        let mut request = self.client.post(url);

        if let Some(headers_map) = headers {
            for (key, value) in headers_map {
                request = request.header(key, value);
            }
        }

        let payload = serde_json::json!({
            "level": notice.level,
            "title": notice.title,
            "message": notice.message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let response = request.json(&payload).send().await?;

        if response.status().is_success() {
            log::info!("Webhook notification sent to {}", url);
        } else {
            log::error!("Webhook failed with status: {}", response.status());
        }

        Ok(())
    }

    async fn send_discord(&self, notice: &Notice, webhook_url: &str) -> Result<()> {
        let color = match notice.level {
            NoticeLevel::Success => 0x00ff00, // Green
            NoticeLevel::Error => 0xff0000,   // Red
            NoticeLevel::Info => 0x0000ff,    // Blue
        };

        let payload = serde_json::json!({
            "embeds": [{
                "title": notice.title,
                "description": notice.message,
                "color": color,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }]
        });

        let response = self.client.post(webhook_url).json(&payload).send().await?;

        if response.status().is_success() {
            log::info!("Discord notification sent: {}", notice.title);
        } else {
            log::error!("Discord webhook failed with status: {}", response.status());
        }

        Ok(())
    }

    async fn send_slack(&self, notice: &Notice, webhook_url: &str) -> Result<()> {
        let payload = serde_json::json!({
            "text": format!("{} {}", level_emoji(notice.level), notice.title),
            "blocks": [{
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*{}*\n{}", notice.title, notice.message)
                }
            }]
        });

        let response = self.client.post(webhook_url).json(&payload).send().await?;

        if response.status().is_success() {
            log::info!("Slack notification sent: {}", notice.title);
        } else {
            log::error!("Slack webhook failed with status: {}", response.status());
        }

        Ok(())
    }
}

fn level_emoji(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => ":white_check_mark:",
        NoticeLevel::Error => ":x:",
        NoticeLevel::Info => ":information_source:",
    }
}

pub fn render_toast(notice: &Notice) -> String {
    let marker = match notice.level {
        NoticeLevel::Success => "✔",
        NoticeLevel::Error => "✖",
        NoticeLevel::Info => "•",
    };
    format!("{} {}: {}", marker, notice.title, notice.message)
}
