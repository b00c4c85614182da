//! Panel toasts and error classification for terminal output.

use client_core::{ClientError, PanelEvent, ToastLevel};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeCategory {
    Transport,
    Validation,
    Server,
    Unknown,
}

impl NoticeCategory {
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Self::Transport => Some("backend unreachable; check --server-url and that the API is running"),
            Self::Validation => Some("check the command arguments"),
            Self::Server | Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    level: ToastLevel,
    category: NoticeCategory,
    message: String,
}

impl Notice {
    pub fn from_message(level: ToastLevel, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_lowercase();
        let category = if message_lower.contains("select at least one source")
            || message_lower.contains("unknown source")
            || message_lower.contains("day window")
            || message_lower.contains("no item at index")
            || message_lower.contains("invalid")
        {
            NoticeCategory::Validation
        } else if message_lower.contains("request to")
            || message_lower.contains("connection")
            || message_lower.contains("timed out")
            || message_lower.contains("timeout")
            || message_lower.contains("dns")
            || message_lower.contains("unavailable")
        {
            NoticeCategory::Transport
        } else if message_lower.contains("http ")
            || message_lower.contains("internal")
            || message_lower.contains("rejected")
            || message_lower.contains("failed:")
        {
            NoticeCategory::Server
        } else {
            NoticeCategory::Unknown
        };

        Self {
            level,
            category,
            message,
        }
    }

    pub fn from_error(err: &ClientError) -> Self {
        let category = if err.is_transport() {
            NoticeCategory::Transport
        } else if err.is_validation() {
            NoticeCategory::Validation
        } else {
            match err {
                ClientError::Api { .. }
                | ClientError::Rejected(_)
                | ClientError::Decode { .. }
                | ClientError::TaskFailed { .. } => NoticeCategory::Server,
                _ => NoticeCategory::Unknown,
            }
        };
        Self {
            level: ToastLevel::Error,
            category,
            message: err.to_string(),
        }
    }

    pub fn category(&self) -> NoticeCategory {
        self.category
    }

    pub fn render(&self) -> String {
        let tag = match self.level {
            ToastLevel::Info => "info",
            ToastLevel::Warning => "warning",
            ToastLevel::Error => "error",
        };
        match (self.level, self.category.hint()) {
            (ToastLevel::Info, _) | (_, None) => format!("[{tag}] {}", self.message),
            (_, Some(hint)) => format!("[{tag}] {} ({hint})", self.message),
        }
    }
}

/// Prints every toast queued on `rx` to stderr. Returns true when a warning
/// or error was among them.
pub fn flush_toasts(rx: &mut broadcast::Receiver<PanelEvent>) -> bool {
    let mut reported = false;
    while let Ok(event) = rx.try_recv() {
        if let PanelEvent::Toast { level, message } = event {
            reported |= level != ToastLevel::Info;
            eprintln!("{}", Notice::from_message(level, message).render());
        }
    }
    reported
}
