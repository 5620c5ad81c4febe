//! Task lifecycle status as reported by engine adapters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of statuses a task can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Download,
    Upload,
    Seed,
    QueuedDownload,
    QueuedUpload,
    Paused,
    Archive,
    Extract,
    Split,
    Clone,
    Check,
    SampleVideo,
    Convert,
    FFmpeg,
}

impl TaskStatus {
    /// Every status, in the order used for menus and overview buckets.
    pub const ALL: [TaskStatus; 14] = [
        TaskStatus::Download,
        TaskStatus::Upload,
        TaskStatus::Seed,
        TaskStatus::Split,
        TaskStatus::Clone,
        TaskStatus::Extract,
        TaskStatus::Archive,
        TaskStatus::QueuedDownload,
        TaskStatus::QueuedUpload,
        TaskStatus::SampleVideo,
        TaskStatus::Convert,
        TaskStatus::FFmpeg,
        TaskStatus::Paused,
        TaskStatus::Check,
    ];

    /// Token used in callback payloads (`canall ms Download 12`, `status 5 st Seed`).
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Download => "Download",
            TaskStatus::Upload => "Upload",
            TaskStatus::Seed => "Seed",
            TaskStatus::QueuedDownload => "QueueDl",
            TaskStatus::QueuedUpload => "QueueUp",
            TaskStatus::Paused => "Pause",
            TaskStatus::Archive => "Archive",
            TaskStatus::Extract => "Extract",
            TaskStatus::Split => "Split",
            TaskStatus::Clone => "Clone",
            TaskStatus::Check => "CheckUp",
            TaskStatus::SampleVideo => "SamVid",
            TaskStatus::Convert => "ConvertMedia",
            TaskStatus::FFmpeg => "FFmpeg",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        TaskStatus::ALL.into_iter().find(|st| st.as_str() == s)
    }

    /// Menu label for the bulk cancel buttons.
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Download => "Downloading",
            TaskStatus::Upload => "Uploading",
            TaskStatus::Seed => "Seeding",
            TaskStatus::QueuedDownload => "QueuedDl",
            TaskStatus::QueuedUpload => "QueuedUp",
            TaskStatus::Paused => "Paused",
            TaskStatus::Archive => "Archiving",
            TaskStatus::Extract => "Extracting",
            TaskStatus::Split => "Splitting",
            TaskStatus::Clone => "Cloning",
            TaskStatus::Check => "Checking",
            TaskStatus::SampleVideo => "SampleVideo",
            TaskStatus::Convert => "ConvertMedia",
            TaskStatus::FFmpeg => "FFmpeg",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status restriction for lists, bulk cancel and status views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => s == status,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(s) => s.as_str(),
        }
    }

    /// Parses `All` or a status token; anything else is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        if s == "All" {
            return Some(StatusFilter::All);
        }
        TaskStatus::parse(s).map(StatusFilter::Only)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
