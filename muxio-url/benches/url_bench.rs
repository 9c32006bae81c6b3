use criterion::{black_box, criterion_group, criterion_main, Criterion};
use muxio_url::{find_tag, parse_int_prefix, split_url};

fn bench_split_url(c: &mut Criterion) {
    let uri = "udp://239.255.0.1:7400?ttl=16&localport=7400&buffer_size=65536&reuse=1";

    c.bench_function("split_url", |b| {
        b.iter(|| {
            let parts = split_url(black_box(uri)).unwrap();
            black_box(parts);
        });
    });
}

fn bench_find_tag(c: &mut Criterion) {
    let query = "ttl=16&localport=7400&pkt_size=1316&buffer_size=65536&connect=1&reuse=1";

    c.bench_function("find_tag_first", |b| {
        b.iter(|| {
            let v = find_tag(black_box(query), "ttl");
            black_box(v);
        });
    });

    c.bench_function("find_tag_last", |b| {
        b.iter(|| {
            let v = find_tag(black_box(query), "reuse");
            black_box(v);
        });
    });

    c.bench_function("find_tag_miss", |b| {
        b.iter(|| {
            let v = find_tag(black_box(query), "sources");
            black_box(v);
        });
    });
}

fn bench_parse_int_prefix(c: &mut Criterion) {
    c.bench_function("parse_int_prefix", |b| {
        b.iter(|| {
            let v = parse_int_prefix(black_box("65536"));
            black_box(v);
        });
    });
}

criterion_group!(benches, bench_split_url, bench_find_tag, bench_parse_int_prefix);
criterion_main!(benches);
