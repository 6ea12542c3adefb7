use crate::store::MirrorStore;
use std::sync::Arc;

/// Scope used when nobody is signed in.
pub const GUEST_IDENTITY: &str = "guest";

const LOG_KEY_SUFFIX: &str = "tradeLogs";

/// Write-through persistence of one identity's log buffer.
///
/// The mirror never fails its caller. A failed write leaves the in-memory
/// buffer authoritative for the running session, a failed read restores
/// nothing. Both are logged.
#[derive(Clone)]
pub struct DurableMirror {
    store: Arc<dyn MirrorStore>,
    identity: String,
}

impl DurableMirror {
    pub fn new(store: Arc<dyn MirrorStore>, identity: Option<&str>) -> Self {
        Self {
            store,
            identity: scope_identity(identity),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The store key for the current identity, e.g. `alice:tradeLogs`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.identity, LOG_KEY_SUFFIX)
    }

    /// Points the mirror at another identity's scope.
    pub fn switch_identity(&mut self, identity: Option<&str>) {
        self.identity = scope_identity(identity);
    }

    /// Saves the full snapshot under the current key.
    ///
    /// Returns whether the write reached the store.
    pub async fn persist(&self, lines: &[String]) -> bool {
        match self.store.save(&self.key(), lines).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key(), "Failed to mirror log buffer; keeping it in memory only.");
                false
            }
        }
    }

    /// Loads the last saved snapshot, or an empty one.
    pub async fn restore(&self) -> Vec<String> {
        match self.store.load(&self.key()).await {
            Ok(Some(lines)) => lines,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, key = %self.key(), "Failed to restore mirrored log buffer; starting empty.");
                Vec::new()
            }
        }
    }
}

fn scope_identity(identity: Option<&str>) -> String {
    match identity.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => GUEST_IDENTITY.to_string(),
    }
}
