use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use burrow_core::descriptor::Descriptor;
use burrow_core::types::VcsReference;

use super::{Checkout, VcsError, VcsProvider};

/// Serves pre-registered checkouts without touching the network
#[derive(Debug, Default)]
pub struct StaticVcs {
    checkouts: RwLock<HashMap<(String, VcsReference), (String, String)>>,
    calls: AtomicUsize,
}

impl StaticVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the commit and descriptor text served for `url` at `reference`
    pub fn insert(&self, url: &str, reference: VcsReference, commit: &str, descriptor: &str) {
        if let Ok(mut checkouts) = self.checkouts.write() {
            checkouts.insert(
                (url.to_string(), reference),
                (commit.to_string(), descriptor.to_string()),
            );
        }
    }

    /// Number of checkouts performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VcsProvider for StaticVcs {
    async fn checkout(&self, url: &str, reference: &VcsReference) -> Result<Checkout, VcsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry = self
            .checkouts
            .read()
            .ok()
            .and_then(|checkouts| checkouts.get(&(url.to_string(), reference.clone())).cloned());
        let Some((commit, text)) = entry else {
            return Err(VcsError::Command {
                url: url.to_string(),
                message: format!("no checkout registered for {reference}"),
            });
        };

        let descriptor = Descriptor::parse(&text).map_err(|error| VcsError::Descriptor {
            url: url.to_string(),
            error,
        })?;
        Ok(Checkout { commit, descriptor })
    }
}
