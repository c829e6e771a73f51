use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Coarse cancellation flag checked between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Trip the token once `after` has elapsed. The timer thread is detached.
    pub fn cancel_after(&self, after: Duration) {
        let token = self.clone();
        thread::spawn(move || {
            thread::sleep(after);
            token.cancel();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_cancel_after() {
        let token = CancelToken::new();
        token.cancel_after(Duration::from_millis(10));
        for _ in 0..200 {
            if token.is_cancelled() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("token was not cancelled");
    }
}
