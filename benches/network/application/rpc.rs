use super::mqtt::client::FrozenClock;
use criterion::{Criterion, Throughput};
use mqtt_rpc::network::application::mqtt::{ClientObserver, Publish, Publisher, QoS};
use mqtt_rpc::network::application::rpc::{
    ROOT, ResponseBuffer, ResponseHandler, RpcError, RpcReply, RpcTree,
};
use mqtt_rpc::network::error::Error;
use std::hint::black_box;

/// Accepts everything and remembers only the last topic.
#[derive(Default)]
struct Sink {
    last_topic: String,
}

impl Publisher for Sink {
    fn publish(&mut self, topic: &str, _payload: &[u8], _qos: QoS) -> Result<(), Error> {
        self.last_topic.clear();
        self.last_topic.push_str(topic);
        Ok(())
    }

    fn subscribe(&mut self, _filter: &str, _qos: QoS) -> Result<u16, Error> {
        Ok(1)
    }

    fn is_connected(&self) -> bool {
        true
    }
}

struct Count(u64);

impl ResponseHandler for Count {
    fn on_response(&mut self, _reply: &RpcReply<'_>) {
        self.0 += 1;
    }
}

pub fn bench_request_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("rpc_request");
    group.throughput(Throughput::Elements(1));

    let mut get_temp = |_: &[u8], out: &mut ResponseBuffer| -> Result<(), RpcError> {
        out.extend_from_slice(b"21.5")
            .map_err(|_| RpcError::BufferOverflow)
    };
    let mut tree: RpcTree<'_, FrozenClock> =
        RpcTree::new(FrozenClock, "site/dev-7").expect("Failed to create tree");
    let mut parent = ROOT;
    for name in ["a", "b", "c"] {
        parent = tree.add_child(parent, name).expect("Failed to add node");
    }
    tree.register_method(parent, "getTemp", &mut get_temp)
        .expect("Failed to register");

    let mut sink = Sink::default();
    let request = Publish {
        topic: "site/dev-7/a/b/c/getTemp/a1b2",
        payload: b"",
        qos: QoS::AtMostOnce,
        retain: false,
    };
    group.bench_function("nested_node", |b| {
        b.iter(|| {
            tree.on_publish(black_box(&request), &mut sink);
        })
    });
    group.finish();
}

pub fn bench_call_and_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("rpc_call");
    group.throughput(Throughput::Elements(1));

    let mut count = Count(0);
    let mut tree: RpcTree<'_, FrozenClock> =
        RpcTree::new(FrozenClock, "site/dev-7").expect("Failed to create tree");
    let key = tree
        .add_response_handler(&mut count)
        .expect("Failed to add handler");
    let mut sink = Sink::default();
    let mut reply_topic = String::new();

    group.bench_function("round_trip", |b| {
        b.iter(|| {
            let id = tree
                .call(&mut sink, "site/dev-9/pump", "start", b"", 1_000, key)
                .expect("Failed to call");
            reply_topic.clear();
            reply_topic.push_str("site/dev-9/pump/resp/start/");
            reply_topic.push_str(id.as_str());
            let reply = Publish {
                topic: &reply_topic,
                payload: &[0],
                qos: QoS::AtMostOnce,
                retain: false,
            };
            tree.on_publish(&reply, &mut sink);
        })
    });
    group.finish();
}
