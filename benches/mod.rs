use criterion::{criterion_group, criterion_main};

mod network;

criterion_group!(
    benches,
    network::application::mqtt::message::bench_build_publish,
    network::application::mqtt::message::bench_parse_publish,
    network::application::mqtt::message::bench_grow_payload,
    network::application::mqtt::client::bench_inbound_qos0,
    network::application::mqtt::client::bench_inbound_qos1,
    network::application::rpc::bench_request_dispatch,
    network::application::rpc::bench_call_and_reply
);
criterion_main!(benches);
