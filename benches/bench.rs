use std::{hint::black_box, sync::Arc, time::Duration};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use s3_request::{
    Callbacks, Credentials, Engine, Operation, RequestContext, RequestHeaders, RequestParams,
    UriStyle,
    transport::{
        OutgoingRequest, Progress, TransferSink, Transport, TransportError, TransportHandle,
    },
};

/// Answers every request with `200 OK` and a fixed number of body chunks.
struct MemoryTransport {
    chunks: usize,
}

struct MemoryHandle {
    upload: u64,
    head_sent: bool,
    chunks_left: usize,
    buf: Vec<u8>,
}

impl Transport for MemoryTransport {
    fn open(&self, request: &OutgoingRequest) -> Result<Box<dyn TransportHandle>, TransportError> {
        Ok(Box::new(MemoryHandle {
            upload: request.body_length().unwrap_or(0),
            head_sent: false,
            chunks_left: self.chunks,
            buf: vec![0; 4096],
        }))
    }
}

impl TransportHandle for MemoryHandle {
    fn advance(&mut self, sink: &mut dyn TransferSink) -> Progress {
        if !self.head_sent {
            self.head_sent = true;
            while self.upload > 0 {
                let cap = self.buf.len().min(self.upload as usize);
                match sink.supply(&mut self.buf[..cap]) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => self.upload -= n as u64,
                }
            }
            sink.status_line(200);
            let _ = sink.header("x-amz-request-id", "BENCH");
            let _ = sink.headers_complete();
            return Progress::Pending;
        }

        if self.chunks_left == 0 {
            return Progress::Done(Ok(()));
        }
        self.chunks_left -= 1;
        match sink.receive(&self.buf) {
            Ok(()) => Progress::Pending,
            Err(_) => Progress::Done(Ok(())),
        }
    }
}

fn engine(chunks: usize) -> Engine {
    Engine::builder()
        .user_agent_info("bench")
        .transport(Arc::new(MemoryTransport { chunks }))
        .build()
        .expect("engine must build")
}

fn credentials() -> Credentials {
    Credentials::new("AKIDEXAMPLE", "SECRETKEYEXAMPLE").expect("static credentials must be valid")
}

fn bench_perform(c: &mut Criterion) {
    let engine = engine(4);
    let creds = credentials();
    let headers = RequestHeaders::new()
        .content_type("application/octet-stream")
        .metadata("m1", "v1")
        .metadata("m2", "v2");

    let mut group = c.benchmark_group("perform");
    group.measurement_time(Duration::from_secs(3));

    for (label, style) in [("virtual", UriStyle::VirtualHost), ("path", UriStyle::Path)] {
        group.bench_function(BenchmarkId::new("get", label), |b| {
            b.iter(|| {
                let params = RequestParams::new(Operation::Get, &creds)
                    .uri_style(style)
                    .bucket(black_box("my-bucket"))
                    .key(black_box("a/b/c/object.txt"));
                let callbacks = Callbacks::new(|status, _, _| {
                    black_box(status);
                })
                .receive(|data| data.len());
                engine.perform(params, callbacks, None);
            });
        });

        group.bench_function(BenchmarkId::new("put_with_headers", label), |b| {
            b.iter(|| {
                let params = RequestParams::new(Operation::Put, &creds)
                    .uri_style(style)
                    .bucket(black_box("my-bucket"))
                    .key(black_box("a/b/c/object.txt"))
                    .request_headers(&headers)
                    .to_s3_total_size(16 * 1024);
                let callbacks = Callbacks::new(|status, _, _| {
                    black_box(status);
                })
                .supply(|buf| Ok(buf.len()))
                .receive(|data| data.len());
                engine.perform(params, callbacks, None);
            });
        });
    }

    group.finish();
}

fn bench_context(c: &mut Criterion) {
    let engine = engine(8);
    let creds = credentials();

    let mut group = c.benchmark_group("context");
    group.measurement_time(Duration::from_secs(3));

    for requests in [1usize, 16, 64] {
        group.bench_function(BenchmarkId::new("get", requests), |b| {
            b.iter(|| {
                let mut context = RequestContext::new();
                for _ in 0..requests {
                    let params = RequestParams::new(Operation::Get, &creds)
                        .bucket("my-bucket")
                        .key("object.txt");
                    let callbacks = Callbacks::new(|status, _, _| {
                        black_box(status);
                    })
                    .receive(|data| data.len());
                    engine.perform(params, callbacks, Some(&mut context));
                }
                context.run_all();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_perform, bench_context);
criterion_main!(benches);
