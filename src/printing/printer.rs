use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info, instrument};

use super::{Label, Printer};
use crate::errors::ServiceError;

pub const MAX_COPIES: u32 = 3;
pub const DEFAULT_MEDIA: &str = "Custom.4x6in";

const PRINTING_HINT: &str =
    "Make sure the printer is switched on, connected and has enough supplies";

/// Copies and media of one submission, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintJob {
    copies: u32,
    media: String,
}

impl Default for PrintJob {
    fn default() -> Self {
        Self {
            copies: 1,
            media: DEFAULT_MEDIA.to_string(),
        }
    }
}

impl PrintJob {
    /// Zero copies means one; an empty media selects [`DEFAULT_MEDIA`].
    pub fn new(copies: u32, media: Option<&str>) -> Result<Self, ServiceError> {
        if copies > MAX_COPIES {
            return Err(ServiceError::ValidationError(format!(
                "can print no more than {} copies",
                MAX_COPIES
            ))
            .into_api(
                format!("Can print no more than {} copies", MAX_COPIES),
                "Lower the number of copies",
            ));
        }
        let media = media
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MEDIA);
        Ok(Self {
            copies: copies.max(1),
            media: media.to_string(),
        })
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn media(&self) -> &str {
        &self.media
    }
}

/// Submits files to a CUPS queue through `lpr`.
#[derive(Debug, Clone)]
pub struct LprPrinter {
    name: String,
}

impl LprPrinter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn args(&self, job: &PrintJob, labels: &[Label]) -> Vec<String> {
        let mut args = vec![
            "-P".to_string(),
            self.name.clone(),
            "-#".to_string(),
            job.copies.to_string(),
            "-o".to_string(),
            format!("media={}", job.media),
        ];
        args.extend(labels.iter().map(|l| l.path.display().to_string()));
        args
    }
}

#[async_trait]
impl Printer for LprPrinter {
    #[instrument(skip(self, labels), fields(printer = %self.name, files = labels.len()))]
    async fn print(&self, job: PrintJob, labels: Vec<Label>) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::InternalError("printer name is empty".into())
                .into_api("Printer name is not configured", "Contact the administrator"));
        }

        let output = Command::new("lpr")
            .args(self.args(&job, &labels))
            .output()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to start lpr");
                ServiceError::ExternalServiceError(format!("lpr: {}", e))
                    .into_api("Printing failed", PRINTING_HINT)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = ?output.status, %stderr, "lpr rejected the job");
            return Err(ServiceError::ExternalServiceError(format!(
                "lpr exited with {}: {}",
                output.status,
                stderr.trim()
            ))
            .into_api("Printing failed", PRINTING_HINT));
        }

        info!(copies = job.copies, media = %job.media, "print job submitted");
        Ok(())
    }
}
