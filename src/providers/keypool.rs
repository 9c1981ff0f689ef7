use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct KeySlot {
    key: String,
    exhausted: bool,
    reset_at: Option<Instant>,
}

/// Rotating pool of API keys for vendors that allow several per account.
///
/// A key marked exhausted is skipped until its reset deadline passes; the
/// deadline is checked lazily on access, there is no background task. Keys
/// are compared by value so re-reading the environment keeps existing
/// exhaustion state.
#[derive(Debug, Default)]
pub struct KeyPool {
    slots: Mutex<Vec<KeySlot>>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        let pool = Self::default();
        pool.sync(keys);
        pool
    }

    /// Build from environment variables, e.g. `GROQ_API_KEY` plus numbered
    /// variants `GROQ_API_KEY_2`, `GROQ_API_KEY_3`, stopping at the first gap.
    pub fn from_env(base_var: &str) -> Self {
        Self::new(read_env_keys(base_var))
    }

    /// Merge the current environment into the pool. New keys are appended
    /// fresh; existing keys keep their exhaustion flags; keys that vanished
    /// from the environment are dropped.
    pub fn sync(&self, keys: Vec<String>) {
        let mut slots = self.slots.lock();
        slots.retain(|slot| keys.contains(&slot.key));
        for key in keys {
            if key.trim().is_empty() {
                continue;
            }
            if !slots.iter().any(|slot| slot.key == key) {
                slots.push(KeySlot {
                    key,
                    exhausted: false,
                    reset_at: None,
                });
            }
        }
    }

    pub fn sync_env(&self, base_var: &str) {
        self.sync(read_env_keys(base_var));
    }

    /// First usable key. Expired exhaustion flags are cleared in passing.
    pub fn current(&self) -> Option<String> {
        let mut slots = self.slots.lock();
        let now = Instant::now();
        for slot in slots.iter_mut() {
            if slot.exhausted {
                match slot.reset_at {
                    Some(deadline) if deadline <= now => {
                        slot.exhausted = false;
                        slot.reset_at = None;
                    }
                    _ => continue,
                }
            }
            return Some(slot.key.clone());
        }
        None
    }

    /// Flag a key as rate limited. With no reset hint the key stays out
    /// until `mark_active` or a pool re-sync that drops it.
    pub fn mark_exhausted(&self, key: &str, reset_after: Option<Duration>) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|slot| slot.key == key) {
            slot.exhausted = true;
            slot.reset_at = reset_after.map(|after| Instant::now() + after);
        }
    }

    pub fn mark_active(&self, key: &str) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.iter_mut().find(|slot| slot.key == key) {
            slot.exhausted = false;
            slot.reset_at = None;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn all_exhausted(&self) -> bool {
        let slots = self.slots.lock();
        !slots.is_empty() && slots.iter().all(|slot| slot.exhausted)
    }
}

fn read_env_keys(base_var: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Ok(key) = std::env::var(base_var) {
        if !key.trim().is_empty() {
            keys.push(key);
        }
    }
    for n in 2.. {
        match std::env::var(format!("{base_var}_{n}")) {
            Ok(key) if !key.trim().is_empty() => keys.push(key),
            _ => break,
        }
    }
    keys
}
