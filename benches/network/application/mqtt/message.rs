use criterion::{BatchSize, Criterion, Throughput};
use mqtt_rpc::network::application::mqtt::{MqttMessage, QoS};
use std::hint::black_box;

pub fn bench_build_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_publish");
    let payload = [0x5Au8; 64];
    group.throughput(Throughput::Bytes(payload.len() as u64));

    let mut message = MqttMessage::<512>::new();
    group.bench_function("qos0", |b| {
        b.iter(|| {
            message
                .init_publish(
                    black_box("site/dev-7/telemetry"),
                    0,
                    QoS::AtMostOnce,
                    false,
                    &payload,
                )
                .expect("Failed to build");
            black_box(message.as_bytes().len())
        })
    });
    group.bench_function("qos1", |b| {
        b.iter(|| {
            message
                .init_publish(
                    black_box("site/dev-7/telemetry"),
                    42,
                    QoS::AtLeastOnce,
                    false,
                    &payload,
                )
                .expect("Failed to build");
            black_box(message.as_bytes().len())
        })
    });
    group.finish();
}

pub fn bench_parse_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_publish");
    let mut source = MqttMessage::<512>::new();
    source
        .init_publish("site/dev-7/sensor/getTemp/a1b2", 7, QoS::AtLeastOnce, false, &[1; 200])
        .expect("Failed to build");
    let bytes = source.as_bytes().to_vec();
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    let mut message = MqttMessage::<512>::new();
    group.bench_function("push_and_validate", |b| {
        b.iter(|| {
            message.reset();
            for &byte in &bytes {
                message.push_received(byte).expect("Failed to receive");
            }
            message.validate_received_bytes().expect("Failed to parse");
            black_box((message.topic_name().is_ok(), message.payload().map(<[u8]>::len)))
        })
    });
    group.finish();
}

pub fn bench_grow_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow_payload");
    let chunk = [0xA5u8; 16];
    group.throughput(Throughput::Bytes(chunk.len() as u64 * 16));

    // Crosses the one-byte remaining-length boundary along the way.
    group.bench_function("append_16x16", |b| {
        b.iter_batched_ref(
            MqttMessage::<512>::new,
            |message| {
                message
                    .init_publish("log", 0, QoS::AtMostOnce, false, &[])
                    .expect("Failed to build");
                for _ in 0..16 {
                    message.append_payload(&chunk).expect("Failed to append");
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
