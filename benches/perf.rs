use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use league_roasted::api::parse_pro_directory_json;
use league_roasted::frames::{FrameDecoder, parse_frame};
use league_roasted::model::{CacheEntry, flatten_pro_directory};
use league_roasted::persist::MemoryStore;
use league_roasted::session_cache::SessionCache;

fn bench_stream_decode(c: &mut Criterion) {
    let bytes = ANALYZE_STREAM.as_bytes();
    c.bench_function("stream_decode_small_reads", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut count = 0usize;
            for chunk in bytes.chunks(black_box(64)) {
                count += decoder.push(chunk).len();
            }
            count += decoder.finish().into_iter().count();
            black_box(count);
        })
    });
}

fn bench_frame_parse(c: &mut Criterion) {
    let mut decoder = FrameDecoder::new();
    let mut payloads = decoder.push(ANALYZE_STREAM.as_bytes());
    payloads.extend(decoder.finish());
    c.bench_function("frame_parse", |b| {
        b.iter(|| {
            for payload in &payloads {
                let event = parse_frame(black_box(payload)).unwrap();
                black_box(event.is_terminal());
            }
        })
    });
}

fn bench_topic_append(c: &mut Criterion) {
    let topics: Vec<String> = (0..5).map(|i| format!("topic_{i}")).collect();
    c.bench_function("session_cache_append", |b| {
        b.iter(|| {
            let cache = SessionCache::new(Arc::new(MemoryStore::new()));
            cache
                .put(
                    "faker#kr1_kr",
                    &CacheEntry {
                        your_stats: serde_json::json!({"total_games": 42}),
                        your_rank: "GOLD IV".to_string(),
                        achievements: Vec::new(),
                        mode: None,
                        used_topics: Vec::new(),
                    },
                )
                .unwrap();
            for _ in 0..20 {
                cache.append_used_topics("faker#kr1_kr", &topics).unwrap();
            }
            black_box(cache.get("faker#kr1_kr").map(|e| e.used_topics.len()));
        })
    });
}

fn bench_pro_directory(c: &mut Criterion) {
    c.bench_function("pro_directory_flatten", |b| {
        b.iter(|| {
            let directory = parse_pro_directory_json(black_box(PRO_PLAYERS_JSON)).unwrap();
            black_box(flatten_pro_directory(&directory).len());
        })
    });
}

criterion_group!(
    perf,
    bench_stream_decode,
    bench_frame_parse,
    bench_topic_append,
    bench_pro_directory
);
criterion_main!(perf);

static ANALYZE_STREAM: &str = include_str!("../tests/fixtures/analyze_stream.txt");
static PRO_PLAYERS_JSON: &str = include_str!("../tests/fixtures/pro_players.json");
