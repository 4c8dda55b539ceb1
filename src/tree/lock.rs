//! Process-wide build lock.
//!
//! Builds already saturate the rayon pool, so at most one BVH or k-d tree
//! build runs at a time. A build that arrives while another is running waits
//! for it. Starting a build from inside another build's shape code
//! (for example building a mesh BVH while the scene BVH is sorting) would
//! deadlock; mesh BVHs are built before the scene build starts.

use parking_lot::{const_mutex, Mutex, MutexGuard};

static BUILD_LOCK: Mutex<()> = const_mutex(());

/// Block until no other build is running and hold the lock for this one.
pub(crate) fn exclusive_build(kind: &'static str) -> MutexGuard<'static, ()> {
    if let Some(guard) = BUILD_LOCK.try_lock() {
        return guard;
    }
    tracing::debug!("{kind} build waiting for a running build to finish");
    BUILD_LOCK.lock()
}

/// Check whether a tree build currently holds the lock.
pub fn is_build_in_progress() -> bool {
    BUILD_LOCK.is_locked()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_second_build_waits() {
        let guard = exclusive_build("first");
        let entered = Arc::new(AtomicBool::new(false));

        let handle = {
            let entered = entered.clone();
            std::thread::spawn(move || {
                let _guard = exclusive_build("second");
                entered.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }
}
