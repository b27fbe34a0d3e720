use std::collections::HashMap;

use crate::{DeviceId, Error, Result};

/// Per-device state keyed by the composite [`DeviceId`].
///
/// Lookups of identities that were never inserted fail with [`Error::NotInitialized`].
/// Mutable access hands out `&mut S`, so at most one caller can mutate a device's state at a
/// time.
#[derive(Debug)]
pub struct DeviceTable<S> {
    entries: HashMap<DeviceId, S>,
}

impl<S> Default for DeviceTable<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S> DeviceTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns the existing state for `id`, creating it with `init` only if absent.
    pub fn get_or_try_insert_with<F>(&mut self, id: DeviceId, init: F) -> Result<&mut S>
    where
        F: FnOnce() -> Result<S>,
    {
        use std::collections::hash_map::Entry;

        match self.entries.entry(id) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => Ok(slot.insert(init()?)),
        }
    }

    pub fn get(&self, id: &DeviceId) -> Result<&S> {
        self.entries.get(id).ok_or(Error::NotInitialized(*id))
    }

    pub fn get_mut(&mut self, id: &DeviceId) -> Result<&mut S> {
        self.entries.get_mut(id).ok_or(Error::NotInitialized(*id))
    }

    pub fn remove(&mut self, id: &DeviceId) -> Result<S> {
        self.entries.remove(id).ok_or(Error::NotInitialized(*id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Backplane, BoardModel, ChannelKind};

    fn id(channel_instance: u8) -> DeviceId {
        DeviceId::new(
            Backplane::Pci,
            BoardModel::PCIE_1553,
            0,
            ChannelKind::Mil1553,
            channel_instance,
        )
    }

    #[test]
    fn unknown_identity_is_not_initialized() {
        let mut table: DeviceTable<u32> = DeviceTable::new();
        assert_eq!(table.get(&id(0)), Err(Error::NotInitialized(id(0))));
        assert_eq!(table.get_mut(&id(0)), Err(Error::NotInitialized(id(0))));
        assert_eq!(table.remove(&id(0)), Err(Error::NotInitialized(id(0))));
    }

    #[test]
    fn insert_is_idempotent() {
        let mut table = DeviceTable::new();
        *table.get_or_try_insert_with(id(1), || Ok(5u32)).unwrap() += 1;

        let mut called = false;
        let value = table
            .get_or_try_insert_with(id(1), || {
                called = true;
                Ok(100)
            })
            .unwrap();
        assert_eq!(*value, 6);
        assert!(!called);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn failed_init_inserts_nothing() {
        let mut table: DeviceTable<u32> = DeviceTable::new();
        let err = table
            .get_or_try_insert_with(id(2), || Err(Error::InvalidArgument("nope")))
            .unwrap_err();
        assert_eq!(err, Error::InvalidArgument("nope"));
        assert!(table.is_empty());
    }
}
