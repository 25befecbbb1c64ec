//! Wrapper functions for the events the bus emits.
//!
//! Each function corresponds to one decision point. The message text of every
//! warning is stable so that hosts and tests can match on it. The library
//! never installs a subscriber; where events end up is up to the host.

use crate::{device::Port, motherboard::DeviceId, ApplicationId};
use tracing::{debug, warn};

pub(crate) fn not_attached_event(device: DeviceId) {
    warn!(
        device,
        "couldn't send message from device with ID {device} because it is not connected to a motherboard"
    );
}

pub(crate) fn invalid_payload_event(payload: &str) {
    warn!(payload, "payload is not in the correct format (binary string)");
}

pub(crate) fn no_listener_event(port: Port, device: DeviceId) {
    warn!(
        port,
        device,
        "no application is listening on port {port} for device with ID {device} to deliver the message to"
    );
}

pub(crate) fn port_taken_event(
    application: ApplicationId,
    port: Port,
    device: DeviceId,
    occupant: ApplicationId,
) {
    warn!(
        application = application.into_inner(),
        port,
        device,
        occupant = occupant.into_inner(),
        "application {application} couldn't be connected to port {port} on device with ID {device} because the port is already taken by application {occupant}"
    );
}

pub(crate) fn already_bound_event(application: ApplicationId, bound: Port, port: Port) {
    warn!(
        application = application.into_inner(),
        bound,
        port,
        "this application {application} is already connected to port {bound} so it was not connected to given port {port}"
    );
}

pub(crate) fn foreign_application_event(application: ApplicationId, device: DeviceId) {
    warn!(
        application = application.into_inner(),
        device,
        "application {application} is hosted by another device so it was not connected to device with ID {device}"
    );
}

pub(crate) fn unknown_recipient_event(recipient: DeviceId) {
    warn!(recipient, "no device matches the message's recipient");
}

pub(crate) fn unbound_application_event(application: ApplicationId) {
    warn!(
        application = application.into_inner(),
        "application {application} is not connected to a port so messages cannot be received"
    );
}

pub(crate) fn duplicate_id_event(device: DeviceId) {
    warn!(
        device,
        "the motherboard already has a device with ID {device}"
    );
}

pub(crate) fn already_attached_event(device: DeviceId) {
    warn!(
        device,
        "device with ID {device} is already connected to another motherboard"
    );
}

pub(crate) fn delivery_event(device: DeviceId, port: Port) {
    debug!(target: "elvis_bus::delivery", device, port, "delivered message");
}

pub(crate) fn broadcast_event(recipients: usize) {
    debug!(target: "elvis_bus::delivery", recipients, "broadcast fan-out complete");
}
