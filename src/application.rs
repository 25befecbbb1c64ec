//! Utilities for running user-level programs on a [`Device`].

use crate::{
    device::{BindError, Device, Port},
    logging,
    message::{is_binary, InvalidPayload},
    motherboard::SendError,
    ApplicationId, Message,
};
use std::sync::Arc;

/// A program that receives messages on a port.
///
/// An application is the leaf of the routing hierarchy. It runs when the
/// device hosting it delivers a message addressed to its port. Everything else
/// an application needs, such as binding to a port or sending, is provided by
/// the [`UserProcess`] running it.
pub trait Application: Send + Sync + 'static {
    /// Called once for every message delivered to the application's port.
    fn receive_message(&self, message: Message);
}

impl<F> Application for F
where
    F: Fn(Message) + Send + Sync + 'static,
{
    fn receive_message(&self, message: Message) {
        self(message)
    }
}

/// Type-erased delivery into a [`UserProcess`], which is what devices keep in
/// their port table.
pub(crate) trait Listener: Send + Sync {
    fn deliver(&self, message: Message);
}

/// A user-level process running an [`Application`] on a fixed device.
///
/// The host device is chosen at construction and never changes. The process
/// holds its device alive; the device only keeps a weak reference back, so
/// dropping the process releases whatever port it was bound to.
///
/// Because of that strong handle, a device stays registered on its
/// motherboard for as long as any process on it exists, even after the host
/// has dropped every other handle to the device.
pub struct UserProcess<A: Application> {
    id: ApplicationId,
    device: Arc<Device>,
    application: A,
}

impl<A: Application> UserProcess<A> {
    /// Creates a new process on `device`. The process is not bound to a port
    /// yet; see [`connect_to_port`](Self::connect_to_port).
    pub fn new(device: &Arc<Device>, application: A) -> Arc<Self> {
        Arc::new(Self {
            id: ApplicationId::next(),
            device: device.clone(),
            application,
        })
    }

    pub fn id(&self) -> ApplicationId {
        self.id
    }

    /// The device hosting this process.
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Gets the application the process is running.
    pub fn application(&self) -> &A {
        &self.application
    }

    /// Binds this process to `port` on its device.
    pub fn connect_to_port(self: &Arc<Self>, port: Port) -> Result<(), BindError> {
        self.device.add_application(port, self)
    }

    pub fn connected_to_a_port(&self) -> bool {
        self.device.is_application_connected(self.id)
    }

    /// The port this process is bound to, if any.
    pub fn port(&self) -> Option<Port> {
        self.device.application_port(self.id)
    }

    /// Releases the port this process is bound to and returns it.
    pub fn disconnect(&self) -> Option<Port> {
        self.device.release(self.id)
    }

    /// Sends a unicast message through the host device. The process must be
    /// bound to a port.
    pub fn send_message(&self, message: Message) -> Result<(), SendError> {
        self.ensure_connected()?;
        self.device.send_message(message)
    }

    /// Broadcasts `payload` through the host device and returns the number of
    /// devices it reached. The process must be bound to a port.
    pub fn send_broadcast_message(&self, payload: &str) -> Result<usize, SendError> {
        if !is_binary(payload) {
            logging::invalid_payload_event(payload);
            return Err(InvalidPayload(payload.to_string()).into());
        }
        self.ensure_connected()?;
        self.device.send_broadcast_message(payload)
    }

    /// Runs the application's handler for `message`.
    pub fn receive_message(&self, message: Message) {
        self.application.receive_message(message)
    }

    fn ensure_connected(&self) -> Result<(), SendError> {
        if self.connected_to_a_port() {
            Ok(())
        } else {
            logging::unbound_application_event(self.id);
            Err(SendError::Unbound(self.id))
        }
    }
}

impl<A: Application> Listener for UserProcess<A> {
    fn deliver(&self, message: Message) {
        self.receive_message(message)
    }
}

impl<A: Application> Drop for UserProcess<A> {
    fn drop(&mut self) {
        self.device.release(self.id);
    }
}
