//! Named, directional attachment points between nodes
//!
//! An [`OutputPort`] owns the [`BufferSlot`] holding the node's produced
//! frame; an [`InputPort`] holds a read-only reference to some other node's
//! slot. All cross-context synchronization in the pipeline happens on these
//! slots: mutation and shape changes occur strictly inside the write lock, so
//! a reader that acquires the lock after `process` released it always sees a
//! fully updated buffer.
//!
//! Lock order is fixed graph-wide: a node locks all of its inputs (in
//! declared port order), then all of its outputs, and the RAII guards release
//! in reverse on every exit path, including errors.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use frameflow_common::{FrameBuffer, PipelineError, Result};

/// Shared storage behind an output port
///
/// `None` means the owning node has not produced a frame yet (or has been
/// reset). The reader count is the "is anything reading me" signal nodes use
/// to skip producing optional views nobody consumes.
#[derive(Debug, Default)]
pub struct BufferSlot {
    buffer: RwLock<Option<FrameBuffer>>,
    readers: AtomicUsize,
}

impl BufferSlot {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of input ports currently connected to this slot
    #[must_use]
    pub fn readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    fn add_reader(&self) {
        self.readers.fetch_add(1, Ordering::AcqRel);
    }

    fn remove_reader(&self) {
        self.readers.fetch_sub(1, Ordering::AcqRel);
    }

    /// Acquire the shared read lock; may block while the owner is mutating
    pub fn read(&self) -> RwLockReadGuard<'_, Option<FrameBuffer>> {
        self.buffer.read().unwrap()
    }

    /// Acquire the exclusive write lock
    pub fn write(&self) -> RwLockWriteGuard<'_, Option<FrameBuffer>> {
        self.buffer.write().unwrap()
    }
}

/// An output port: named handle on the node's owned [`BufferSlot`]
#[derive(Debug)]
pub struct OutputPort {
    name: &'static str,
    slot: Arc<BufferSlot>,
}

impl OutputPort {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: BufferSlot::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Clone the shared slot handle (for readers outside the graph)
    #[must_use]
    pub fn slot(&self) -> Arc<BufferSlot> {
        Arc::clone(&self.slot)
    }

    /// Number of connected readers
    #[must_use]
    pub fn readers(&self) -> usize {
        self.slot.readers()
    }

    /// Lock the slot for mutation; guard releases on drop
    pub fn lock(&self) -> OutputGuard<'_> {
        OutputGuard {
            inner: self.slot.write(),
        }
    }

    /// Drop the owned buffer under lock (reset/teardown path)
    pub fn clear(&self) {
        self.slot.write().take();
    }
}

/// Write guard over an output slot's optional buffer
#[derive(Debug)]
pub struct OutputGuard<'a> {
    inner: RwLockWriteGuard<'a, Option<FrameBuffer>>,
}

impl Deref for OutputGuard<'_> {
    type Target = Option<FrameBuffer>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for OutputGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

/// An input port: optional read-only reference to an upstream slot
#[derive(Debug)]
pub struct InputPort {
    name: &'static str,
    source: Option<Arc<BufferSlot>>,
}

impl InputPort {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name, source: None }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    /// Bind this input to an upstream output port
    ///
    /// Rebinding releases the previous connection; reader counts are kept
    /// accurate either way. Connections are resolved before the pipeline
    /// runs and never change during processing.
    pub fn connect(&mut self, upstream: &OutputPort) {
        self.disconnect();
        let slot = upstream.slot();
        slot.add_reader();
        self.source = Some(slot);
    }

    pub fn disconnect(&mut self) {
        if let Some(slot) = self.source.take() {
            slot.remove_reader();
        }
    }

    /// Lock and borrow the upstream buffer for the duration of the guard
    ///
    /// Fails fast instead of dereferencing a missing buffer: a disconnected
    /// port or an upstream that has not produced yet is a connectivity error
    /// naming this port.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Connectivity`] if unconnected or the slot is empty.
    pub fn read(&self, node: &str) -> Result<InputGuard<'_>> {
        let slot = self.source.as_ref().ok_or_else(|| PipelineError::Connectivity {
            node: node.to_string(),
            port: self.name.to_string(),
        })?;
        let guard = slot.read();
        if guard.is_none() {
            return Err(PipelineError::Connectivity {
                node: node.to_string(),
                port: format!("{} (upstream buffer not produced)", self.name),
            });
        }
        Ok(InputGuard { inner: guard })
    }
}

impl Drop for InputPort {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Read guard over a connected, produced upstream buffer
///
/// Derefs straight to the [`FrameBuffer`]; the `Some` case was checked at
/// acquisition and the shared lock prevents replacement while held. Readers
/// must not retain the reference past the guard.
#[derive(Debug)]
pub struct InputGuard<'a> {
    inner: RwLockReadGuard<'a, Option<FrameBuffer>>,
}

impl Deref for InputGuard<'_> {
    type Target = FrameBuffer;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().expect("checked at acquisition")
    }
}
