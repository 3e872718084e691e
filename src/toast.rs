use chrono::{DateTime, Duration, Utc};
use log::warn;

/// How long an error notification stays up.
pub const TOAST_DURATION_MS: i64 = 4000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Toast {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::milliseconds(TOAST_DURATION_MS)
    }
}

/// Transient error notifications, oldest first.
#[derive(Debug, Default)]
pub struct Toaster {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl Toaster {
    pub fn error(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> u64 {
        let message = message.into();
        warn!("{}", message);

        self.next_id += 1;
        self.toasts.push(Toast {
            id: self.next_id,
            message,
            created_at: now,
        });
        self.next_id
    }

    pub fn visible(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().filter(move |toast| toast.is_live(now))
    }

    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.toasts.retain(|toast| toast.is_live(now));
    }
}
