use ecofarm_client::CredentialStore;
use ecofarm_core::ScrapeTarget;

/// API key plus the scrape action waiting for one.
#[derive(Default)]
pub(crate) struct AuthState {
    key: Option<String>,
    /// Whether `key` is the copy held in `store`.
    persisted: bool,
    pending: Option<ScrapeTarget>,
    store: Option<CredentialStore>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("key", &self.key.as_ref().map(|_| "[redacted]"))
            .field("persisted", &self.persisted)
            .field("pending", &self.pending)
            .field("store", &self.store)
            .finish()
    }
}

impl AuthState {
    /// Attaches persistent storage. A key already held in memory wins over
    /// the stored one.
    pub(crate) fn with_store(mut self, store: CredentialStore) -> Self {
        if self.key.is_none() {
            match store.load() {
                Ok(key) => {
                    self.persisted = key.is_some();
                    self.key = key;
                }
                Err(e) => tracing::warn!(error = %e, "ignoring unreadable credentials file"),
            }
        }
        self.store = Some(store);
        self
    }

    /// Holds `key` for this session only. `None` or a blank key leaves the
    /// current key in place.
    pub(crate) fn set_session_key(&mut self, key: Option<String>) {
        if let Some(key) = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            self.key = Some(key);
            self.persisted = false;
        }
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn prompt_open(&self) -> bool {
        self.pending.is_some()
    }

    /// Parks `target` until a key is confirmed. A newer request replaces an
    /// older parked one.
    pub(crate) fn defer(&mut self, target: ScrapeTarget) {
        self.pending = Some(target);
    }

    pub(crate) fn take_pending(&mut self) -> Option<ScrapeTarget> {
        self.pending.take()
    }

    /// Holds `key` and persists it when a store is attached.
    pub(crate) fn accept(&mut self, key: &str) {
        self.key = Some(key.to_string());
        self.persisted = match &self.store {
            Some(store) => match store.save(key) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "could not persist API key");
                    false
                }
            },
            None => false,
        };
    }

    /// Drops a key the server rejected. The persisted copy is deleted only
    /// when it is the key that was rejected.
    pub(crate) fn reject(&mut self) {
        self.key = None;
        if std::mem::take(&mut self.persisted) {
            self.clear_store();
        }
    }

    /// Drops the held key and deletes the persisted copy.
    pub(crate) fn forget(&mut self) {
        self.key = None;
        self.persisted = false;
        self.clear_store();
    }

    fn clear_store(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "could not remove stored API key");
            }
        }
    }
}
