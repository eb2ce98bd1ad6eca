pub mod api;
pub mod job;
pub mod keywords;
pub mod template;
pub mod timefmt;

pub use api::{ApiErrorBody, CreateOutlineJobRequest, KeywordInput, Page, PageQuery};
pub use job::{any_active, BulkJob, JobAction, JobId, JobStatus};
pub use keywords::{build_outline_request, count_keyword_lines, parse_keyword_lines, KeywordError, MAX_KEYWORDS_PER_BATCH};
pub use template::{BulkTemplate, TemplateDraft, TemplateError, Tone, WritingStyle};
pub use timefmt::{format_timestamp, parse_timezone};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/bulkgen/config.yaml";
pub const DEFAULT_DRAFTS_PATH: &str = "/var/lib/bulkgen/drafts.db";

// Per-user fallbacks, relative to $HOME
pub const USER_CONFIG_PATH: &str = ".config/bulkgen/config.yaml";
pub const USER_DRAFTS_PATH: &str = ".local/share/bulkgen/drafts.db";
