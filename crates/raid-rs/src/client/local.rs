//! In-process [`ServerProxy`] backed by a shared [`BlockServerState`],
//! with a settable "down" flag. Lets the client's failure-mode logic be
//! exercised without a network, the same way the stripe-layout tests this
//! crate grew out of drove their `Array`/`Volume` types directly rather than
//! through a transport.

use std::sync::{Arc, Mutex};

use super::ServerProxy;
use crate::server::{BlockServerState, GetOutcome};

/// `LocalProxy` wraps a `BlockServerState` behind the `ServerProxy` trait,
/// with a settable "down" flag that makes every call behave as if the
/// connection were refused -- standing in for a server that has crashed or
/// become unreachable.
#[derive(Clone)]
pub struct LocalProxy {
    state: Arc<Mutex<BlockServerState>>,
    down: Arc<Mutex<bool>>,
}

impl LocalProxy {
    #[must_use]
    pub fn new(state: BlockServerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            down: Arc::new(Mutex::new(false)),
        }
    }

    /// `set_down` flips whether every subsequent call returns a transport error.
    pub fn set_down(&self, down: bool) {
        *self.down.lock().unwrap() = down;
    }

    #[must_use]
    pub fn is_down(&self) -> bool {
        *self.down.lock().unwrap()
    }

    /// `with_state` grants scoped access to the underlying state, e.g. to
    /// inject corruption or assert on stored bytes from a test.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut BlockServerState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl ServerProxy for LocalProxy {
    async fn get(&self, s: u64) -> anyhow::Result<GetOutcome> {
        if self.is_down() {
            anyhow::bail!("connection refused (simulated)");
        }
        self.state.lock().unwrap().get(s)
    }

    async fn put(&self, s: u64, data: &[u8]) -> anyhow::Result<()> {
        if self.is_down() {
            anyhow::bail!("connection refused (simulated)");
        }
        self.state.lock().unwrap().put(s, data)
    }
}
