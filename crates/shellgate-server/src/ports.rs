//! Extra terminal tabs: a small fixed pool of ports above the base port.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shellgate_common::TerminalError;

use crate::descriptor::TerminalDescriptor;

/// Offset of the first extra tab from the base port.
pub const TAB_PORT_OFFSET: u16 = 2;

/// Maximum number of live extra tabs.
pub const TAB_CAPACITY: usize = 4;

/// Assigns distinct ports from `base + 2 ..= base + 5`.
#[derive(Debug)]
pub struct PortAllocator {
    base: u16,
    slots: BTreeMap<u16, Arc<TerminalDescriptor>>,
}

impl PortAllocator {
    pub fn new(base: u16) -> Self {
        Self {
            base,
            slots: BTreeMap::new(),
        }
    }

    /// Candidate ports in allocation order.
    fn candidates(&self) -> impl Iterator<Item = u16> + '_ {
        (0..TAB_CAPACITY as u16).filter_map(move |i| self.base.checked_add(TAB_PORT_OFFSET + i))
    }

    /// Register a clone of `template` at the lowest free port.
    ///
    /// Fails with `ResourceExhausted` without touching the pool when every
    /// slot is taken.
    pub fn reserve(&mut self, template: &TerminalDescriptor) -> Result<u16, TerminalError> {
        let port = self
            .candidates()
            .find(|port| !self.slots.contains_key(port))
            .ok_or(TerminalError::ResourceExhausted {
                capacity: TAB_CAPACITY,
            })?;

        self.slots.insert(port, Arc::new(template.for_port(port)));
        Ok(port)
    }

    /// Free a slot. Returns `false` if nothing was registered there.
    pub fn release(&mut self, port: u16) -> bool {
        self.slots.remove(&port).is_some()
    }

    pub fn get(&self, port: u16) -> Option<Arc<TerminalDescriptor>> {
        self.slots.get(&port).cloned()
    }

    /// Live ports in ascending order.
    pub fn ports(&self) -> Vec<u16> {
        self.slots.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The canonical descriptor plus the extra-tab pool, shared between the
/// manager (which allocates) and the gateway (which resolves handshakes).
#[derive(Debug)]
pub struct TabDirectory {
    primary: Arc<TerminalDescriptor>,
    extra: Mutex<PortAllocator>,
}

impl TabDirectory {
    pub fn new(primary: TerminalDescriptor) -> Self {
        let base = primary.port;
        Self {
            primary: Arc::new(primary),
            extra: Mutex::new(PortAllocator::new(base)),
        }
    }

    fn pool(&self) -> MutexGuard<'_, PortAllocator> {
        self.extra.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn primary(&self) -> &Arc<TerminalDescriptor> {
        &self.primary
    }

    /// Descriptor for a handshake: `None` selects the canonical terminal,
    /// `Some(port)` an extra tab. Unknown tabs resolve to `None`.
    pub fn resolve(&self, tab: Option<u16>) -> Option<Arc<TerminalDescriptor>> {
        match tab {
            None => Some(Arc::clone(&self.primary)),
            Some(port) => self.pool().get(port),
        }
    }

    pub fn open_tab(&self) -> Result<u16, TerminalError> {
        self.pool().reserve(&self.primary)
    }

    pub fn close_tab(&self, port: u16) -> bool {
        self.pool().release(port)
    }

    pub fn tabs(&self) -> Vec<u16> {
        self.pool().ports()
    }
}
