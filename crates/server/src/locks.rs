use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

type LockMap = DashMap<String, Arc<RwLock<()>>>;

/// Per-profile-name locks.
///
/// Creating a profile takes the write side so readers of the same name never
/// observe a half-written directory. Different names never contend.
/// An entry lives only while some request holds or waits on it.
#[derive(Clone, Default)]
pub struct ProfileLocks {
    locks: Arc<LockMap>,
}

/// Guard for one name; releases the lock and prunes the unused entry on drop.
pub struct NameGuard<G> {
    guard: Option<G>,
    name: String,
    locks: Arc<LockMap>,
}

impl<G> Drop for NameGuard<G> {
    fn drop(&mut self) {
        // Release first so our own clone no longer counts
        drop(self.guard.take());
        self.locks
            .remove_if(&self.name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl ProfileLocks {
    fn lock_for(&self, name: &str) -> Arc<RwLock<()>> {
        self.locks.entry(name.to_string()).or_default().clone()
    }

    fn guard<G>(&self, name: &str, guard: G) -> NameGuard<G> {
        NameGuard {
            guard: Some(guard),
            name: name.to_string(),
            locks: self.locks.clone(),
        }
    }

    pub async fn read(&self, name: &str) -> NameGuard<OwnedRwLockReadGuard<()>> {
        let guard = self.lock_for(name).read_owned().await;
        self.guard(name, guard)
    }

    pub async fn write(&self, name: &str) -> NameGuard<OwnedRwLockWriteGuard<()>> {
        let guard = self.lock_for(name).write_owned().await;
        self.guard(name, guard)
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn writer_excludes_readers_of_same_name() {
        let locks = ProfileLocks::default();
        let guard = locks.write("alpha").await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.read("alpha")).await;
        assert!(blocked.is_err(), "reader should wait for the writer");

        drop(guard);
        let reader = tokio::time::timeout(Duration::from_millis(50), locks.read("alpha")).await;
        assert!(reader.is_ok());
    }

    #[tokio::test]
    async fn different_names_do_not_contend() {
        let locks = ProfileLocks::default();
        let _alpha = locks.write("alpha").await;

        let beta = tokio::time::timeout(Duration::from_millis(50), locks.write("beta")).await;
        assert!(beta.is_ok());
    }

    #[tokio::test]
    async fn released_names_are_pruned() {
        let locks = ProfileLocks::default();

        for i in 0..100 {
            let _guard = locks.read(&format!("name-{i}")).await;
        }

        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn held_name_stays_tracked() {
        let locks = ProfileLocks::default();
        let first = locks.read("shared").await;
        let second = locks.read("shared").await;

        drop(first);
        assert_eq!(locks.tracked(), 1);

        drop(second);
        assert_eq!(locks.tracked(), 0);
    }
}
