//! ClickGuardian — swallows stray pointer input while a tour is running so a
//! click on the dimmed page or the spotlighted element cannot dismiss it.
//!
//! The host supplies a capture-phase hook ([`PointerHost`]); the guardian
//! installs one interceptor per running tour and the returned [`GuardHandle`]
//! removes it again when dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Where a pointer event landed, as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerTarget {
    /// Inside the tour's dimming overlay.
    pub in_overlay: bool,
    /// Inside the currently spotlighted element.
    pub in_spotlight: bool,
    /// On the tour's own close control.
    pub is_close_control: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Up,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub target: PointerTarget,
}

/// What the host should do with an intercepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Stop propagation and prevent the default action.
    Suppress,
}

/// Suppression policy for a running tour.
pub fn verdict(event: &PointerEvent) -> Verdict {
    let target = &event.target;
    if target.is_close_control {
        return Verdict::Pass;
    }
    if target.in_overlay || target.in_spotlight {
        Verdict::Suppress
    } else {
        Verdict::Pass
    }
}

pub type PointerInterceptor = Arc<dyn Fn(&PointerEvent) -> Verdict + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Host capability for root-level capture-phase pointer interception.
pub trait PointerHost: Send + Sync {
    fn install(&self, interceptor: PointerInterceptor) -> ListenerId;
    fn remove(&self, id: ListenerId);
}

/// Installs the suppression policy on a host.
#[derive(Clone)]
pub struct ClickGuardian {
    host: Arc<dyn PointerHost>,
}

impl ClickGuardian {
    pub fn new(host: Arc<dyn PointerHost>) -> Self {
        Self { host }
    }

    /// Install the interceptor. It stays installed until the handle drops.
    pub fn engage(&self, page_id: &str) -> GuardHandle {
        let interceptor: PointerInterceptor = Arc::new(|event: &PointerEvent| verdict(event));
        let id = self.host.install(interceptor);
        debug!(page_id, listener = id.0, "Click guardian installed");
        GuardHandle {
            host: Arc::clone(&self.host),
            id,
            page_id: page_id.to_string(),
        }
    }
}

/// Scoped ownership of one installed interceptor.
pub struct GuardHandle {
    host: Arc<dyn PointerHost>,
    id: ListenerId,
    page_id: String,
}

impl GuardHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.host.remove(self.id);
        debug!(page_id = %self.page_id, listener = self.id.0, "Click guardian removed");
    }
}

/// In-process [`PointerHost`] that dispatches events through every installed
/// interceptor, capture-phase style: the first `Suppress` wins.
#[derive(Default)]
pub struct CaptureRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ListenerId, PointerInterceptor>>,
}

impl CaptureRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn dispatch(&self, event: &PointerEvent) -> Verdict {
        let listeners: Vec<PointerInterceptor> = match self.listeners.lock() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => return Verdict::Pass,
        };
        if listeners.iter().any(|l| l(event) == Verdict::Suppress) {
            Verdict::Suppress
        } else {
            Verdict::Pass
        }
    }

    pub fn active(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }
}

impl PointerHost for CaptureRegistry {
    fn install(&self, interceptor: PointerInterceptor) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(id, interceptor);
        }
        id
    }

    fn remove(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.remove(&id);
        }
    }
}
