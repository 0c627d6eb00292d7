use criterion::{Criterion, Throughput};
use mqtt_rpc::network::application::mqtt::{
    Credentials, MqttClient, MqttMessage, NoopObserver, Options, QoS,
};
use mqtt_rpc::network::error::Error;
use mqtt_rpc::network::{Close, Connection, Read, Write};
use mqtt_rpc::time::TimeBase;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// In-memory transport: reads drain a shared queue, writes are discarded.
#[derive(Clone, Default)]
pub struct Loopback {
    inbound: Rc<RefCell<VecDeque<u8>>>,
}

impl Loopback {
    pub fn inject(&self, bytes: &[u8]) {
        self.inbound.borrow_mut().extend(bytes.iter().copied());
    }
}

impl Read for Loopback {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut inbound = self.inbound.borrow_mut();
        let n = buf.len().min(inbound.len());
        for (slot, byte) in buf.iter_mut().zip(inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for Loopback {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for Loopback {
    type Error = Error;
    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for Loopback {}

#[derive(Clone, Copy)]
pub struct FrozenClock;

impl TimeBase for FrozenClock {
    fn now_us(&self) -> u32 {
        0
    }
}

pub fn connected_client(client_id: &str) -> (MqttClient<Loopback, FrozenClock>, Loopback) {
    let mut client = MqttClient::new(Options::new(client_id).expect("client id"), FrozenClock);
    let link = Loopback::default();
    client
        .connect(link.clone(), Credentials::default())
        .expect("Failed to connect");
    link.inject(&[0x20, 0x02, 0x00, 0x00]);
    client.update(&mut NoopObserver);
    assert!(client.is_connected());
    (client, link)
}

fn encoded_publish(qos: QoS, payload: &[u8]) -> Vec<u8> {
    let mut message = MqttMessage::<512>::new();
    message
        .init_publish("bench/topic", 1, qos, false, payload)
        .expect("Failed to build");
    message.as_bytes().to_vec()
}

fn bench_inbound(c: &mut Criterion, name: &str, qos: QoS) {
    let mut group = c.benchmark_group(name);
    let packet = encoded_publish(qos, b"hello world from bench");
    let burst: Vec<u8> = packet.iter().copied().cycle().take(packet.len() * 50).collect();
    group.throughput(Throughput::Bytes(burst.len() as u64));

    let (mut client, link) = connected_client(name);
    group.bench_function("update_50", |b| {
        b.iter(|| {
            link.inject(&burst);
            client.update(&mut NoopObserver);
        })
    });
    group.finish();
}

pub fn bench_inbound_qos0(c: &mut Criterion) {
    bench_inbound(c, "inbound_qos0", QoS::AtMostOnce);
}

pub fn bench_inbound_qos1(c: &mut Criterion) {
    bench_inbound(c, "inbound_qos1", QoS::AtLeastOnce);
}
