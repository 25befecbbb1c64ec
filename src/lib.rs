//! A miniature in-process message bus for simulated hardware topologies.
//!
//! A central hub, the [`Motherboard`], connects [`Device`]s identified by
//! integer IDs. Each device hosts applications bound to integer ports, and
//! applications exchange unicast [`Message`]s and broadcast payloads through
//! the hub.
//!
//! # Organization
//! - [`Message`](message::Message) and [`Payload`](message::Payload) are the
//!   values being routed; payloads are binary strings
//! - [`Motherboard`] owns the device ID namespace and routes messages
//! - [`Device`] owns a port namespace and dispatches to applications
//! - [`Application`] and [`UserProcess`] implement the programs bound to ports
//!
//! # Routing
//!
//! A unicast travels from a [`UserProcess`] to its device, up to the
//! motherboard, down to the device whose identifier matches the message's
//! recipient, and finally to the application listening on the message's port.
//! A broadcast travels up the same way and then fans out to every attached
//! device that has opted in, where it is handled by the device's
//! [`BroadcastReceiver`](device::BroadcastReceiver).
//!
//! Every step either succeeds or fails with a typed error. Failures are also
//! reported as `tracing` warning events; the library never installs a
//! subscriber, so where they go is up to the host.
//!
//! ```
//! use elvis_bus::{device::IgnoreBroadcasts, Device, Message, Motherboard, UserProcess};
//! use std::sync::{Arc, Mutex};
//!
//! let motherboard = Motherboard::new();
//! let sender = Device::new(1, false, IgnoreBroadcasts);
//! let receiver = Device::new(2, false, IgnoreBroadcasts);
//! sender.set_motherboard(&motherboard).unwrap();
//! receiver.set_motherboard(&motherboard).unwrap();
//!
//! let inbox = Arc::new(Mutex::new(Vec::new()));
//! let listener = {
//!     let inbox = inbox.clone();
//!     UserProcess::new(&receiver, move |message: Message| {
//!         inbox.lock().unwrap().push(message)
//!     })
//! };
//! listener.connect_to_port(2).unwrap();
//!
//! let talker = UserProcess::new(&sender, |_: Message| {});
//! talker.connect_to_port(1).unwrap();
//! talker.send_message(Message::new(2, 2, "100").unwrap()).unwrap();
//!
//! assert_eq!(*inbox.lock().unwrap(), vec![Message::new(2, 2, "100").unwrap()]);
//! ```

mod logging;

pub mod message;
pub use message::Message;

pub mod device;
pub use device::Device;

pub mod motherboard;
pub use motherboard::Motherboard;

pub mod application;
pub use application::{Application, UserProcess};

mod id;
pub use id::ApplicationId;
