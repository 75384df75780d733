use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct Entry {
    code: String,
    expires_at: DateTime<Utc>,
}

/// Short-lived one-time codes keyed by phone number or email.
///
/// Every read and write goes through the one mutex, so concurrent handlers
/// never see a code half-replaced.
#[derive(Clone)]
pub struct OtpStore {
    ttl: TimeDelta,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl OtpStore {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Issues a fresh 6-digit code for `key`, replacing any previous one.
    pub async fn issue(&self, key: &str, now: DateTime<Utc>) -> String {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                code: code.clone(),
                expires_at: now + self.ttl,
            },
        );
        code
    }

    /// Checks and consumes the code. Expired or unknown codes never verify.
    pub async fn verify(&self, key: &str, code: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at <= now => {
                entries.remove(key);
                false
            }
            Some(entry) if entry.code == code => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Drops every expired code; returns how many were removed.
    pub async fn purge(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}
