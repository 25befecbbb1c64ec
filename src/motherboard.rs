//! The [`Motherboard`], which routes messages between devices.

use crate::{
    device::{Device, Port},
    logging,
    message::{InvalidPayload, Payload},
    ApplicationId, Message,
};
use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock, Weak},
};

/// An identifier for a particular [`Device`] on a motherboard.
pub type DeviceId = u64;

/// The hub that owns the device ID namespace.
///
/// A motherboard keeps a table of the devices attached to it, keyed by each
/// device's identifier. It does not own the devices: entries are weak, and a
/// device removes itself when it is dropped. Every attached device holds the
/// motherboard alive in turn.
///
/// Broadcasts fan out in ascending device ID order. Broadcast receivers should
/// not rely on that.
#[derive(Debug, Default)]
pub struct Motherboard {
    devices: RwLock<BTreeMap<DeviceId, Weak<Device>>>,
}

impl Motherboard {
    /// Creates a motherboard with no devices attached.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Routes a message to the device matching its recipient.
    pub fn send_message(&self, message: Message) -> Result<(), SendError> {
        let recipient = message.recipient();
        let device = self
            .devices
            .read()
            .unwrap()
            .get(&recipient)
            .and_then(Weak::upgrade);
        match device {
            Some(device) => device.receive_message(message),
            None => {
                logging::unknown_recipient_event(recipient);
                Err(SendError::UnknownRecipient(recipient))
            }
        }
    }

    /// Hands `payload` to every attached device that has opted in to
    /// broadcasts and returns how many devices that was.
    pub fn send_broadcast_message(&self, payload: &Payload) -> usize {
        let devices: Vec<_> = self
            .devices
            .read()
            .unwrap()
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        let mut recipients = 0;
        for device in devices.iter().filter(|device| device.receives_broadcast()) {
            device.receive_broadcast_message(payload);
            recipients += 1;
        }
        logging::broadcast_event(recipients);
        recipients
    }

    /// A snapshot of the devices attached to this motherboard.
    pub fn devices(&self) -> DeviceTable {
        let devices = self
            .devices
            .read()
            .unwrap()
            .iter()
            .filter_map(|(id, device)| Some((*id, device.upgrade()?)))
            .collect();
        DeviceTable(Arc::new(devices))
    }

    /// The device attached under `identifier`, if any.
    pub fn device(&self, identifier: DeviceId) -> Option<Arc<Device>> {
        self.devices
            .read()
            .unwrap()
            .get(&identifier)
            .and_then(Weak::upgrade)
    }

    pub fn has_device_with_id(&self, identifier: DeviceId) -> bool {
        self.devices.read().unwrap().contains_key(&identifier)
    }

    /// Attaches `device` under its own identifier. Both the table entry and
    /// the device's reference back to this motherboard are set together.
    pub fn add_device(self: &Arc<Self>, device: &Arc<Device>) -> Result<(), MembershipError> {
        let mut devices = self.devices.write().unwrap();
        let mut state = device.state().write().unwrap();
        let identifier = state.identifier;
        if devices.contains_key(&identifier) {
            logging::duplicate_id_event(identifier);
            return Err(MembershipError::DuplicateId(identifier));
        }
        if state.motherboard.is_some() {
            logging::already_attached_event(identifier);
            return Err(MembershipError::AlreadyAttached(identifier));
        }
        devices.insert(identifier, Arc::downgrade(device));
        state.motherboard = Some(self.clone());
        Ok(())
    }

    /// Detaches the device registered under `identifier` and returns it. The
    /// device is free to attach to a motherboard again afterwards.
    pub fn remove_device(&self, identifier: DeviceId) -> Option<Arc<Device>> {
        let (device, previous) = {
            let mut devices = self.devices.write().unwrap();
            let device = devices.remove(&identifier)?.upgrade()?;
            let previous = device.state().write().unwrap().motherboard.take();
            (device, previous)
        };
        // Released outside the table lock.
        drop(previous);
        Some(device)
    }

    /// Moves `device` to a new key. Returns `None` if the device is no longer
    /// attached to this motherboard.
    pub(crate) fn rename(
        &self,
        device: &Device,
        identifier: DeviceId,
    ) -> Option<Result<(), MembershipError>> {
        let mut devices = self.devices.write().unwrap();
        let mut state = device.state().write().unwrap();
        let attached_here = state
            .motherboard
            .as_ref()
            .is_some_and(|motherboard| std::ptr::eq(Arc::as_ptr(motherboard), self));
        if !attached_here {
            return None;
        }
        if devices.contains_key(&identifier) {
            logging::duplicate_id_event(identifier);
            return Some(Err(MembershipError::DuplicateId(identifier)));
        }
        if let Some(entry) = devices.remove(&state.identifier) {
            devices.insert(identifier, entry);
        }
        state.identifier = identifier;
        Some(Ok(()))
    }

    /// Drops the entry for a device that is going away, provided the entry
    /// still refers to that device.
    pub(crate) fn forget(&self, identifier: DeviceId, device: *const Device) {
        let mut devices = self.devices.write().unwrap();
        if devices
            .get(&identifier)
            .is_some_and(|entry| entry.as_ptr() == device)
        {
            devices.remove(&identifier);
        }
    }

    /// The number of devices attached.
    pub fn len(&self) -> usize {
        self.devices.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A read-only snapshot of a motherboard's device table, in ascending ID
/// order.
#[derive(Debug, Clone, Default)]
pub struct DeviceTable(Arc<BTreeMap<DeviceId, Arc<Device>>>);

impl DeviceTable {
    pub fn get(&self, identifier: DeviceId) -> Option<&Arc<Device>> {
        self.0.get(&identifier)
    }

    pub fn contains_id(&self, identifier: DeviceId) -> bool {
        self.0.contains_key(&identifier)
    }

    pub fn ids(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &Arc<Device>)> + '_ {
        self.0.iter().map(|(id, device)| (*id, device))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a message could not be routed to its destination.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    InvalidPayload(#[from] InvalidPayload),
    #[error("device with ID {0} is not connected to a motherboard")]
    NotAttached(DeviceId),
    #[error("no device matches the message's recipient {0}")]
    UnknownRecipient(DeviceId),
    #[error("no application is listening on port {port} for device with ID {device}")]
    NoListener { port: Port, device: DeviceId },
    #[error("application {0} is not connected to a port")]
    Unbound(ApplicationId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("the motherboard already has a device with ID {0}")]
    DuplicateId(DeviceId),
    #[error("device with ID {0} is already connected to a motherboard")]
    AlreadyAttached(DeviceId),
}
