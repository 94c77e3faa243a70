use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something the orchestrator can ask whether the user gave up.
pub trait CancelCheck: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels. Used by batch callers such as the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    predicate: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also reports cancelled whenever `predicate` returns true,
    /// for hosts that expose cancellation as a query (a progress monitor).
    pub fn from_predicate(predicate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        Self {
            flag: Arc::default(),
            predicate: Some(Arc::new(predicate)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        match &self.predicate {
            Some(predicate) if predicate() => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

impl CancelCheck for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.flag.load(Ordering::SeqCst))
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}
