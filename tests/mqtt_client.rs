mod common;

use common::{Event, MockClock, MockConnection, Recorder, connack, frames, parse, publish_bytes};
use mqtt_rpc::network::application::mqtt::{
    ClientObserver, ConnectFailure, Credentials, DisconnectReason, MqttClient, Options,
    PacketType, Publisher, QoS, State,
};
use mqtt_rpc::network::error::Error;

type Client = MqttClient<MockConnection, MockClock>;

fn client_with(keep_alive_seconds: u16) -> (Client, MockClock) {
    let clock = MockClock::new();
    let mut options = Options::new("test-device").unwrap();
    options.keep_alive_seconds = keep_alive_seconds;
    (MqttClient::new(options, clock.clone()), clock)
}

/// Connect and complete the handshake, returning the link with CONNECT drained.
fn connected(client: &mut Client, observer: &mut Recorder) -> MockConnection {
    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.take_written();
    link.inject(&connack(0));
    client.update(observer);
    assert_eq!(client.state(), State::Connected);
    link
}

#[test]
fn connect_sends_connect_packet() {
    let (mut client, _clock) = client_with(30);
    let link = MockConnection::new();

    client
        .connect(
            link.clone(),
            Credentials {
                username: Some("user"),
                password: Some("pass"),
            },
        )
        .unwrap();
    assert_eq!(client.state(), State::Connecting);

    let written = link.take_written();
    let packets = frames(&written);
    assert_eq!(packets.len(), 1);
    let connect = parse(&packets[0]);
    assert_eq!(connect.packet_type(), Some(PacketType::Connect));
    assert_eq!(connect.connect_client_id().unwrap(), "test-device");
    assert_eq!(connect.connect_keep_alive().unwrap(), 30);
    assert!(connect.connect_clean_session().unwrap());
    assert_eq!(connect.connect_username().unwrap(), Some("user"));
    assert_eq!(connect.connect_password().unwrap(), Some(&b"pass"[..]));
}

#[test]
fn accepted_connack_establishes_session() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder {
        subscribe_on_connect: Some("cmd/#"),
        ..Recorder::default()
    };

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.take_written();
    link.inject(&connack(0));
    client.update(&mut observer);

    assert!(client.is_connected());
    assert_eq!(client.failed_connects(), 0);
    assert_eq!(observer.events, vec![Event::Connected]);
    assert_eq!(observer.results, vec![Ok(1)]);

    let written = link.take_written();
    let subscribe = parse(&frames(&written)[0]);
    assert_eq!(subscribe.packet_type(), Some(PacketType::Subscribe));
    let filters: Vec<_> = subscribe.subscribe_filters().unwrap().collect();
    assert_eq!(filters, vec![("cmd/#", QoS::AtLeastOnce)]);
}

#[test]
fn refused_connack_reports_failure() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.inject(&connack(5));
    client.update(&mut observer);

    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(client.failed_connects(), 1);
    assert!(link.is_closed());
    assert_eq!(
        observer.events,
        vec![Event::ConnectFailed(ConnectFailure::Refused(5))]
    );
}

#[test]
fn missing_connack_times_out() {
    let (mut client, clock) = client_with(60);
    let mut observer = Recorder::default();

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();

    clock.advance_ms(9_999);
    client.update(&mut observer);
    assert_eq!(client.state(), State::Connecting);

    clock.advance_ms(1);
    client.update(&mut observer);
    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(
        observer.events,
        vec![Event::ConnectFailed(ConnectFailure::Timeout)]
    );
    assert!(link.is_closed());
}

#[test]
fn packet_before_connack_is_unexpected() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.inject(&[0xD0, 0x00]);
    client.update(&mut observer);

    assert_eq!(
        observer.events,
        vec![Event::ConnectFailed(ConnectFailure::UnexpectedPacket)]
    );
    assert_eq!(client.failed_connects(), 1);
}

#[test]
fn connect_twice_is_rejected() {
    let (mut client, _clock) = client_with(60);
    client
        .connect(MockConnection::new(), Credentials::default())
        .unwrap();

    let second = MockConnection::new();
    assert_eq!(
        client.connect(second.clone(), Credentials::default()),
        Err(Error::InvalidState)
    );
    assert!(second.is_closed());
    assert_eq!(client.state(), State::Connecting);
}

#[test]
fn failed_connect_write_counts_as_failure() {
    let (mut client, _clock) = client_with(60);
    let link = MockConnection::new();
    link.set_fail_writes(true);

    assert_eq!(
        client.connect(link.clone(), Credentials::default()),
        Err(Error::WriteError)
    );
    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(client.failed_connects(), 1);
    assert!(link.is_closed());
}

#[test]
fn publish_requires_session() {
    let (mut client, _clock) = client_with(60);
    assert_eq!(
        client.publish("a/b", b"x", QoS::AtMostOnce),
        Err(Error::NotConnected)
    );
    assert_eq!(
        client.subscribe("a/#", QoS::AtMostOnce),
        Err(Error::NotConnected)
    );
}

#[test]
fn publish_writes_packet() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    client.publish("a/b", &[1, 2, 3], QoS::AtMostOnce).unwrap();
    client.publish("a/c", b"ack me", QoS::AtLeastOnce).unwrap();
    assert_eq!(
        client.publish("a/d", b"", QoS::ExactlyOnce),
        Err(Error::InvalidArgument)
    );

    let written = link.take_written();
    let packets = frames(&written);
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0], publish_bytes("a/b", &[1, 2, 3], QoS::AtMostOnce, 0));

    let second = parse(&packets[1]);
    assert_eq!(second.topic_name().unwrap(), "a/c");
    assert_eq!(second.qos().unwrap(), QoS::AtLeastOnce);
    assert_eq!(second.packet_id().unwrap(), 1);
}

#[test]
fn inbound_qos1_publish_is_acknowledged() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    link.inject(&publish_bytes("sensors/t", b"21.5", QoS::AtLeastOnce, 0x1234));
    client.update(&mut observer);

    assert_eq!(link.take_written(), vec![0x40, 0x02, 0x12, 0x34]);
    assert_eq!(
        observer.events.last(),
        Some(&Event::Message {
            topic: "sensors/t".to_string(),
            payload: b"21.5".to_vec(),
            qos: QoS::AtLeastOnce,
        })
    );
}

#[test]
fn observer_can_publish_from_callback() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);
    observer.echo_to = Some("echo");

    link.inject(&publish_bytes("in", b"ping", QoS::AtMostOnce, 0));
    client.update(&mut observer);

    assert_eq!(observer.results, vec![Ok(0)]);
    assert_eq!(
        link.take_written(),
        publish_bytes("echo", b"ping", QoS::AtMostOnce, 0)
    );
}

#[test]
fn several_packets_in_one_update() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    link.inject(&publish_bytes("a", b"1", QoS::AtMostOnce, 0));
    link.inject(&[0xD0, 0x00]);
    link.inject(&publish_bytes("b", b"2", QoS::AtMostOnce, 0));
    client.update(&mut observer);

    let topics: Vec<_> = observer
        .events
        .iter()
        .filter_map(|event| match event {
            Event::Message { topic, .. } => Some(topic.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(topics, vec!["a", "b"]);
}

#[test]
fn malformed_packet_is_dropped() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    // Topic length says 5 bytes but only 0 follow.
    link.inject(&[0x30, 0x02, 0x00, 0x05]);
    link.inject(&publish_bytes("ok", b"", QoS::AtMostOnce, 0));
    client.update(&mut observer);

    assert!(client.is_connected());
    assert_eq!(observer.events.len(), 2);
    assert!(matches!(&observer.events[1], Event::Message { topic, .. } if topic == "ok"));
}

#[test]
fn oversized_packet_is_skipped() {
    let clock = MockClock::new();
    let mut client: MqttClient<MockConnection, MockClock, 64> =
        MqttClient::new(Options::new("small").unwrap(), clock);
    let mut observer = Recorder::default();

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.inject(&connack(0));
    client.update(&mut observer);

    link.inject(&publish_bytes("big", &[0xAA; 100], QoS::AtMostOnce, 0));
    link.inject(&publish_bytes("small", b"fits", QoS::AtMostOnce, 0));
    client.update(&mut observer);

    assert_eq!(observer.events.len(), 2);
    assert_eq!(
        observer.events[1],
        Event::Message {
            topic: "small".to_string(),
            payload: b"fits".to_vec(),
            qos: QoS::AtMostOnce,
        }
    );
}

#[test]
fn keep_alive_sends_ping_and_accepts_response() {
    let (mut client, clock) = client_with(5);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    clock.advance_ms(4_999);
    client.update(&mut observer);
    assert!(link.take_written().is_empty());

    clock.advance_ms(1);
    client.update(&mut observer);
    assert_eq!(link.take_written(), vec![0xC0, 0x00]);

    link.inject(&[0xD0, 0x00]);
    client.update(&mut observer);
    clock.advance_ms(9_000);
    client.update(&mut observer);
    assert!(client.is_connected());
    assert_eq!(link.take_written(), vec![0xC0, 0x00]);
}

#[test]
fn missing_ping_response_drops_session() {
    let (mut client, clock) = client_with(5);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    clock.advance_ms(5_000);
    client.update(&mut observer);
    assert_eq!(link.take_written(), vec![0xC0, 0x00]);

    clock.advance_ms(10_000);
    client.update(&mut observer);
    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(
        observer.events.last(),
        Some(&Event::Disconnected(DisconnectReason::PingTimeout))
    );
    assert!(link.is_closed());
}

#[test]
fn zero_keep_alive_never_pings() {
    let (mut client, clock) = client_with(0);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    clock.advance_ms(600_000);
    client.update(&mut observer);
    assert!(link.take_written().is_empty());
    assert!(client.is_connected());
}

#[test]
fn long_keep_alive_pings_after_counter_wrap() {
    let (mut client, clock) = client_with(7_200);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    let mut first_ping = None;
    for minute in 1..=180 {
        clock.advance_ms(60_000);
        client.update(&mut observer);
        if link.take_written() == vec![0xC0, 0x00] {
            first_ping = Some(minute);
            break;
        }
    }
    assert_eq!(first_ping, Some(120));
    assert!(client.is_connected());
}

#[test]
fn write_failure_drops_session() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    link.set_fail_writes(true);
    assert_eq!(
        client.publish("a", b"x", QoS::AtMostOnce),
        Err(Error::WriteError)
    );
    client.update(&mut observer);

    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(
        observer.events.last(),
        Some(&Event::Disconnected(DisconnectReason::TransportError))
    );
}

#[test]
fn read_failure_drops_session() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    link.set_fail_reads(true);
    client.update(&mut observer);
    assert_eq!(
        observer.events.last(),
        Some(&Event::Disconnected(DisconnectReason::TransportError))
    );
}

#[test]
fn requested_disconnect_is_reported_once() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = connected(&mut client, &mut observer);

    client.disconnect();
    assert_eq!(client.state(), State::Disconnected);
    assert_eq!(link.take_written(), vec![0xE0, 0x00]);
    assert!(link.is_closed());

    client.update(&mut observer);
    client.update(&mut observer);
    assert_eq!(
        observer.events,
        vec![
            Event::Connected,
            Event::Disconnected(DisconnectReason::Requested)
        ]
    );
}

#[test]
fn disconnect_while_connecting_is_silent() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();
    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.take_written();

    client.disconnect();
    client.update(&mut observer);
    assert!(observer.events.is_empty());
    assert!(link.take_written().is_empty());
}

#[test]
fn events_reach_every_observer_in_a_slice() {
    let (mut client, _clock) = client_with(60);
    let mut first = Recorder::default();
    let mut second = Recorder::default();

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.inject(&connack(0));
    link.inject(&publish_bytes("x", b"y", QoS::AtMostOnce, 0));
    {
        let mut observers: [&mut dyn ClientObserver; 2] = [&mut first, &mut second];
        client.update(&mut observers);
    }

    assert_eq!(first.events, second.events);
    assert_eq!(first.events.len(), 2);
}

#[test]
fn reconnect_after_failure() {
    let (mut client, _clock) = client_with(60);
    let mut observer = Recorder::default();

    let link = MockConnection::new();
    client.connect(link.clone(), Credentials::default()).unwrap();
    link.inject(&connack(4));
    client.update(&mut observer);
    assert_eq!(client.failed_connects(), 1);

    let retry = MockConnection::new();
    client.connect(retry.clone(), Credentials::default()).unwrap();
    retry.inject(&connack(0));
    client.update(&mut observer);
    assert!(client.is_connected());
    assert_eq!(client.failed_connects(), 0);
}
