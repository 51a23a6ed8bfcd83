/* src/server/core/rust/src/cache.rs */

//! TTL cache of rendered pages keyed by (component, props).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use crate::renderer::RenderedPage;

/// Cache key: sha256 over the render path and the serialized props.
pub fn cache_key(path: &str, props: &serde_json::Value) -> String {
  let mut hasher = Sha256::new();
  hasher.update(path.as_bytes());
  hasher.update([0u8]);
  hasher.update(props.to_string().as_bytes());
  hex::encode(hasher.finalize())
}

struct Slot {
  page: RenderedPage,
  stored_at: Instant,
}

/// Shared render cache. Expired slots are dropped when read.
/// A zero TTL disables caching entirely.
pub struct RenderCache {
  ttl: Duration,
  slots: RwLock<HashMap<String, Slot>>,
}

impl RenderCache {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, slots: RwLock::new(HashMap::new()) }
  }

  pub fn disabled() -> Self {
    Self::new(Duration::ZERO)
  }

  pub fn is_enabled(&self) -> bool {
    !self.ttl.is_zero()
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  pub fn get(&self, key: &str) -> Option<RenderedPage> {
    if !self.is_enabled() {
      return None;
    }
    {
      let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
      match slots.get(key) {
        Some(slot) if slot.stored_at.elapsed() < self.ttl => return Some(slot.page.clone()),
        Some(_) => {}
        None => return None,
      }
    }
    // expired
    let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
    if slots.get(key).is_some_and(|s| s.stored_at.elapsed() >= self.ttl) {
      slots.remove(key);
    }
    None
  }

  pub fn insert(&self, key: String, page: RenderedPage) {
    if !self.is_enabled() {
      return;
    }
    let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
    slots.insert(key, Slot { page, stored_at: Instant::now() });
  }

  pub fn len(&self) -> usize {
    self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self.slots.write().unwrap_or_else(PoisonError::into_inner).clear();
  }
}

impl std::fmt::Debug for RenderCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RenderCache").field("ttl", &self.ttl).field("len", &self.len()).finish()
  }
}
