use std::hint::black_box;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use http::StatusCode;
use micro_httpd::codec::{HeaderEncoder, ReadBuffer, RequestDecoder};
use micro_httpd::protocol::ResponseHead;
use micro_httpd::timer::{SortedList, TimeHeap, TimeWheel, TimerStore, Timers};
use tokio_util::codec::Encoder;

const SMALL_REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
const CURL_REQUEST: &[u8] = b"GET /index.html HTTP/1.1\r\nHost: 127.0.0.1:8080\r\nUser-Agent: curl/7.79.1\r\n\
Accept: */*\r\nAccept-Language: en-US,en;q=0.9\r\nConnection: keep-alive\r\n\r\n";

fn bench_request_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decoder");

    for (name, request) in [("small", SMALL_REQUEST), ("curl", CURL_REQUEST)] {
        group.throughput(Throughput::Bytes(request.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), request, |b, request| {
            let mut buffer = ReadBuffer::default();
            let mut decoder = RequestDecoder::new();
            b.iter(|| {
                buffer.reset();
                decoder.reset();
                buffer.extend_from_slice(request);
                black_box(decoder.decode(&mut buffer).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_response_encoder(c: &mut Criterion) {
    let head = ResponseHead::new(StatusCode::OK, 4096, true);
    let mut bytes = BytesMut::with_capacity(1024);

    c.bench_function("encode_response_head", |b| {
        b.iter(|| {
            bytes.clear();
            HeaderEncoder.encode(black_box(head), &mut bytes).unwrap();
        });
    });
}

fn bench_timers(c: &mut Criterion) {
    const ENTRIES: u64 = 1024;
    let mut group = c.benchmark_group("timers");
    let stores: [(&str, fn(Instant) -> Timers<u64>); 3] = [
        ("list", |_| Timers::List(SortedList::new())),
        ("wheel", |start| Timers::Wheel(TimeWheel::new(60, Duration::from_millis(100), start))),
        ("heap", |_| Timers::Heap(TimeHeap::new())),
    ];

    for (name, new_store) in stores {
        group.bench_function(BenchmarkId::new("insert_adjust_expire", name), |b| {
            b.iter_batched(
                Instant::now,
                |start| {
                    let mut store = new_store(start);
                    let ids: Vec<_> = (0..ENTRIES)
                        .map(|i| store.insert(start + Duration::from_millis(100 * (i % 50 + 1)), i))
                        .collect();
                    for (i, id) in (0..ENTRIES).zip(ids) {
                        black_box(store.adjust(id, start + Duration::from_millis(100 * (i % 60 + 1))));
                    }
                    let fired = store.tick(start + Duration::from_secs(7), &mut |owner| {
                        black_box(owner);
                    });
                    assert_eq!(fired, ENTRIES as usize);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder, bench_timers);
criterion_main!(benches);
