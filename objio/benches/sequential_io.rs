//! Sequential throughput benchmark
//!
//! Reads and writes a 64 MiB object through the in-memory backend with a
//! simulated per-request latency, comparing buffered streams against raw
//! ones and across worker counts.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use objio::objio_system::ObjectKind;
use objio::{BufferConfig, OpenOptions, presets};
use objio_platform::MemorySystem;

const OBJECT_SIZE: usize = 64 * 1024 * 1024;
const LATENCY: Duration = Duration::from_millis(2);

fn main() {
    println!("===== objio Sequential I/O Benchmark =====\n");

    let system = MemorySystem::new().with_read_delay(LATENCY);
    system.put_object("bench.bin", ObjectKind::Block, vec![0x5A; OBJECT_SIZE]);

    benchmark_reads(&system);
    benchmark_writes();
}

fn report(label: &str, bytes: usize, elapsed: Duration) {
    let mib = bytes as f64 / (1024.0 * 1024.0);
    println!("  {:<28} {:>8.3}s {:>10.1} MiB/s", label, elapsed.as_secs_f64(), mib / elapsed.as_secs_f64());
}

fn benchmark_reads(system: &MemorySystem) {
    println!("--- Sequential Read ({} MiB, {:?} per request) ---", OBJECT_SIZE >> 20, LATENCY);

    for workers in [1, 4, 16] {
        let config = BufferConfig::new(presets::BUFFER_1M)
            .unwrap()
            .with_max_buffers(workers * 2)
            .with_max_workers(workers)
            .unwrap();
        let mut stream = OpenOptions::new().config(config).open(system.clone(), "bench.bin").unwrap();

        let start = Instant::now();
        let mut sink = Vec::with_capacity(OBJECT_SIZE);
        stream.read_to_end(&mut sink).unwrap();
        stream.close().unwrap();
        assert_eq!(sink.len(), OBJECT_SIZE);
        report(&format!("buffered, {} workers", workers), OBJECT_SIZE, start.elapsed());
    }

    let mut raw = OpenOptions::new().buffered(false).open(system.clone(), "bench.bin").unwrap();
    let mut buf = vec![0u8; presets::BUFFER_1M];
    let start = Instant::now();
    let mut total = 0;
    loop {
        let n = raw.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        total += n;
    }
    report("raw, 1 MiB reads", total, start.elapsed());
    println!();
}

fn benchmark_writes() {
    println!("--- Sequential Write ({} MiB) ---", OBJECT_SIZE >> 20);
    let chunk = vec![0xC3; 64 * 1024];

    for (label, kind) in [("block", ObjectKind::Block), ("page", ObjectKind::Page)] {
        for workers in [1, 8] {
            let system = MemorySystem::new();
            let config = BufferConfig::new(presets::BUFFER_4M)
                .unwrap()
                .with_max_buffers(workers)
                .with_max_workers(workers)
                .unwrap();
            let mut stream = OpenOptions::new()
                .mode("w")
                .kind(kind)
                .config(config)
                .open(system.clone(), "out.bin")
                .unwrap();

            let start = Instant::now();
            for _ in 0..OBJECT_SIZE / chunk.len() {
                stream.write_all(&chunk).unwrap();
            }
            stream.close().unwrap();
            report(&format!("{}, {} workers", label, workers), OBJECT_SIZE, start.elapsed());
            assert_eq!(system.get_object("out.bin").map(|data| data.len()), Some(OBJECT_SIZE));
        }
    }
    println!();
}
