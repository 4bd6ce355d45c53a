// Channel - the one explicit cross-coroutine hand-off primitive.
//
// Capacity 0 is an unbuffered rendezvous: send blocks the issuing VM
// thread until a receiver takes the value. Larger capacities buffer.
// Blocking is host-thread blocking; unrelated VM threads are unaffected.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use parking_lot::Mutex;

use crate::lua_value::LuaValue;
use crate::lua_vm::{LuaError, LuaResult};

#[derive(Clone)]
pub struct LuaChannel {
    inner: Arc<ChannelInner>,
}

struct ChannelInner {
    /// Taken on close; in-flight senders hold clones until they finish.
    tx: Mutex<Option<SyncSender<LuaValue>>>,
    rx: Mutex<Receiver<LuaValue>>,
}

impl LuaChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = sync_channel(capacity);
        LuaChannel {
            inner: Arc::new(ChannelInner {
                tx: Mutex::new(Some(tx)),
                rx: Mutex::new(rx),
            }),
        }
    }

    /// Send a value, blocking until a receiver (or buffer slot) takes it.
    pub fn send(&self, value: LuaValue) -> LuaResult<()> {
        // clone the sender out of the lock so close() cannot deadlock
        // behind a blocked rendezvous send
        let tx = match &*self.inner.tx.lock() {
            Some(tx) => tx.clone(),
            None => return Err(LuaError::ChannelClosed),
        };
        tx.send(value).map_err(|_| LuaError::ChannelClosed)
    }

    /// Receive the next value, blocking until one is sent.
    /// Returns `None` once the channel is closed and drained.
    pub fn recv(&self) -> Option<LuaValue> {
        self.inner.rx.lock().recv().ok()
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> Option<LuaValue> {
        self.inner.rx.lock().try_recv().ok()
    }

    pub fn close(&self) {
        self.inner.tx.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.tx.lock().is_none()
    }

    #[inline]
    pub fn same_channel(&self, other: &LuaChannel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        Arc::as_ptr(&self.inner) as *const u8
    }
}
