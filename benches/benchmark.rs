use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgba, RgbaImage};
use snag::{
    build_text_chunk, crc32, encode_base64_sliced, encode_png, inject_text_chunks,
    segment_count, stitch, MetadataEntry, Segment, DEFAULT_ENCODING_SLICE,
};
use std::time::Duration;

#[cfg(feature = "integration_benchmarks")]
use snag::{CaptureTarget, ChromeSurface, Config, SnagService};
#[cfg(feature = "integration_benchmarks")]
use tokio::runtime::Runtime;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 251) as u8, (y % 241) as u8, ((x ^ y) % 239) as u8, 255])
    });
    encode_png(&image).unwrap()
}

fn sample_entries() -> Vec<MetadataEntry> {
    vec![
        MetadataEntry::new("CapturedURL", "https://example.com/articles/42"),
        MetadataEntry::new("PageTitle", "Example Domain"),
        MetadataEntry::new("Timestamp", "2025-01-01T00:00:00.000Z"),
    ]
}

// === UNIT BENCHMARKS ===

fn benchmark_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");
    configure_fast_group(&mut group);

    let small = vec![0xA5u8; 64];
    let large = vec![0x5Au8; 1 << 20];

    group.bench_function("64_bytes", |b| b.iter(|| black_box(crc32(black_box(&small)))));
    group.bench_function("1_mib", |b| b.iter(|| black_box(crc32(black_box(&large)))));

    group.finish();
}

fn benchmark_text_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_chunks");
    configure_fast_group(&mut group);

    let entries = sample_entries();
    let png = sample_png(640, 480);

    group.bench_function("build", |b| {
        b.iter(|| {
            for entry in &entries {
                black_box(build_text_chunk(entry).unwrap());
            }
        });
    });

    group.bench_function("inject", |b| {
        b.iter(|| black_box(inject_text_chunks(&png, &entries).unwrap()));
    });

    group.finish();
}

fn benchmark_base64(c: &mut Criterion) {
    let mut group = c.benchmark_group("base64");
    configure_fast_group(&mut group);

    let bytes = sample_png(800, 800);

    for slice in [1024, DEFAULT_ENCODING_SLICE] {
        group.bench_function(format!("slice_{slice}"), |b| {
            b.iter(|| black_box(encode_base64_sliced(&bytes, slice).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("stitch");
    configure_fast_group(&mut group);

    let segments: Vec<Segment> = (0..4u32)
        .map(|i| Segment {
            offset_y: i * 720,
            image: RgbaImage::from_pixel(1280, 720, Rgba([i as u8 * 60, 0, 0, 255])),
        })
        .collect();

    group.bench_function("four_segments", |b| {
        b.iter(|| black_box(stitch(&segments, true).unwrap()));
    });

    group.bench_function("segment_count", |b| {
        b.iter(|| {
            for total in [0u32, 720, 2500, 100_000] {
                black_box(segment_count(black_box(total), 720).unwrap());
            }
        });
    });

    group.finish();
}

// === INTEGRATION BENCHMARKS (require Chrome) ===

#[cfg(feature = "integration_benchmarks")]
fn benchmark_full_page_capture(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("full_page_capture");
    configure_fast_group(&mut group);

    group.bench_function("example_com", |b| {
        b.iter(|| {
            rt.block_on(async {
                let config = Config {
                    settle_delay: Duration::from_millis(50),
                    ..Default::default()
                };

                let surface = ChromeSurface::launch(&config, "https://example.com")
                    .await
                    .unwrap();
                let service = SnagService::new(config);

                let result = service
                    .capture_full_page(&surface, &CaptureTarget::default())
                    .await;
                let size = result.map(|a| a.bytes.len()).unwrap_or(0);

                surface.shutdown().await;
                black_box(size);
            })
        });
    });

    group.finish();
}

// === BENCHMARK GROUPS ===

criterion_group!(
    unit_benches,
    benchmark_crc32,
    benchmark_text_chunks,
    benchmark_base64,
    benchmark_stitch,
);

#[cfg(feature = "integration_benchmarks")]
criterion_group!(integration_benches, benchmark_full_page_capture);

#[cfg(feature = "integration_benchmarks")]
criterion_main!(unit_benches, integration_benches);

#[cfg(not(feature = "integration_benchmarks"))]
criterion_main!(unit_benches);
