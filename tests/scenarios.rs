use elvis_bus::{
    device::{BindError, BroadcastReceiver, IgnoreBroadcasts},
    message::Payload,
    motherboard::{MembershipError, SendError},
    Application, Device, Message, Motherboard, UserProcess,
};
use std::sync::{Arc, Mutex};
use tracing_test::traced_test;

#[derive(Default)]
struct Inbox(Mutex<Vec<Message>>);

impl Inbox {
    fn messages(&self) -> Vec<Message> {
        self.0.lock().unwrap().clone()
    }
}

impl Application for Inbox {
    fn receive_message(&self, message: Message) {
        self.0.lock().unwrap().push(message);
    }
}

type BroadcastLog = Arc<Mutex<Vec<Payload>>>;

struct Recorder(BroadcastLog);

impl BroadcastReceiver for Recorder {
    fn receive_broadcast(&self, payload: &Payload) {
        self.0.lock().unwrap().push(payload.clone());
    }
}

fn attached(motherboard: &Arc<Motherboard>, identifier: u64) -> anyhow::Result<Arc<Device>> {
    let device = Device::new(identifier, false, IgnoreBroadcasts);
    device.set_motherboard(motherboard)?;
    Ok(device)
}

#[test]
fn unicast_happy_path() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let sending_device = attached(&motherboard, 1)?;
    let receiving_device = attached(&motherboard, 2)?;

    let receiver = UserProcess::new(&receiving_device, Inbox::default());
    receiver.connect_to_port(2)?;
    let sender = UserProcess::new(&sending_device, Inbox::default());
    sender.connect_to_port(1)?;

    sender.send_message(Message::new(2, 2, "100")?)?;

    assert_eq!(receiver.application().messages(), vec![Message::new(2, 2, "100")?]);
    assert!(sender.application().messages().is_empty());
    Ok(())
}

#[test]
#[traced_test]
fn no_recipient() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let sending_device = attached(&motherboard, 1)?;

    assert_eq!(
        sending_device.send_message(Message::new(2, 2, "100")?),
        Err(SendError::UnknownRecipient(2))
    );
    assert!(logs_contain("no device matches the message's recipient"));
    Ok(())
}

#[test]
#[traced_test]
fn no_listener_on_port() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let sending_device = attached(&motherboard, 1)?;
    let _receiving_device = attached(&motherboard, 2)?;

    assert_eq!(
        sending_device.send_message(Message::new(2, 2, "100")?),
        Err(SendError::NoListener { port: 2, device: 2 })
    );
    assert!(logs_contain(
        "no application is listening on port 2 for device with ID 2"
    ));
    Ok(())
}

#[test]
#[traced_test]
fn port_collision() {
    let device = Device::new(1, false, IgnoreBroadcasts);
    let first = UserProcess::new(&device, Inbox::default());
    let second = UserProcess::new(&device, Inbox::default());

    assert_eq!(device.add_application(1, &first), Ok(()));
    assert!(matches!(
        device.add_application(1, &second),
        Err(BindError::PortTaken { port: 1, .. })
    ));
    assert!(logs_contain("because the port is already taken by application"));

    let ports = device.port_mapping();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports.get(1), Some(first.id()));
}

#[test]
fn identifier_swap_while_attached() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let device = attached(&motherboard, 1)?;

    device.set_identifier(5)?;
    let devices = motherboard.devices();
    assert!(devices.contains_id(5));
    assert!(!devices.contains_id(1));

    // The motherboard already has a device with ID 5: this one.
    assert_eq!(device.set_identifier(5), Err(MembershipError::DuplicateId(5)));
    assert_eq!(device.identifier(), 5);
    Ok(())
}

#[test]
#[traced_test]
fn broadcast_fan_out() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let subscribed_log = BroadcastLog::default();
    let ignoring_log = BroadcastLog::default();
    let subscribed = Device::new(1, true, Recorder(subscribed_log.clone()));
    let ignoring = Device::new(2, false, Recorder(ignoring_log.clone()));
    subscribed.set_motherboard(&motherboard)?;
    ignoring.set_motherboard(&motherboard)?;

    let application = UserProcess::new(&subscribed, Inbox::default());
    application.connect_to_port(1)?;

    assert_eq!(application.send_broadcast_message("101"), Ok(1));
    assert_eq!(*subscribed_log.lock().unwrap(), vec![Payload::new("101")?]);
    assert!(ignoring_log.lock().unwrap().is_empty());

    assert!(matches!(
        application.send_broadcast_message("xyz"),
        Err(SendError::InvalidPayload(_))
    ));
    assert!(logs_contain(
        "payload is not in the correct format (binary string)"
    ));
    assert_eq!(subscribed_log.lock().unwrap().len(), 1);
    Ok(())
}

#[test]
fn reply_from_inside_a_handler() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let client_device = attached(&motherboard, 1)?;
    let server_device = attached(&motherboard, 2)?;

    let client = UserProcess::new(&client_device, Inbox::default());
    client.connect_to_port(10)?;

    // The server answers every message on the device it lives on, which is
    // only possible if no lock is held while handlers run.
    let server = {
        let reply_through = server_device.clone();
        UserProcess::new(&server_device, move |message: Message| {
            let reply = Message::with_payload(1, 10, message.payload().clone());
            reply_through.send_message(reply).unwrap();
        })
    };
    server.connect_to_port(20)?;

    client.send_message(Message::new(2, 20, "0110")?)?;
    assert_eq!(client.application().messages(), vec![Message::new(1, 10, "0110")?]);
    Ok(())
}

#[test]
fn tables_stay_inverse() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let device = attached(&motherboard, 1)?;
    let processes: Vec<_> = (0..4)
        .map(|_| UserProcess::new(&device, Inbox::default()))
        .collect();
    for (port, process) in (100..).zip(&processes) {
        process.connect_to_port(port)?;
    }
    device.remove_application(101);
    processes[3].disconnect();
    assert!(matches!(
        processes[0].connect_to_port(101),
        Err(BindError::AlreadyBound { port: 100, .. })
    ));

    let ports = device.port_mapping();
    let applications = device.app_mapping();
    assert_eq!(ports.len(), applications.len());
    for (port, application) in ports.iter() {
        assert_eq!(applications.get(application), Some(port));
    }
    for (application, port) in applications.iter() {
        assert_eq!(ports.get(port), Some(application));
    }
    Ok(())
}

#[test]
fn add_then_remove_device_leaves_no_trace() -> anyhow::Result<()> {
    let motherboard = Motherboard::new();
    let device = Device::new(7, true, IgnoreBroadcasts);
    motherboard.add_device(&device)?;
    assert!(motherboard.remove_device(7).is_some());

    assert!(motherboard.is_empty());
    assert!(!motherboard.has_device_with_id(7));
    assert!(device.motherboard().is_none());
    assert_eq!(
        motherboard.send_broadcast_message(&Payload::new("1")?),
        0
    );
    Ok(())
}
