// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Measure append and formatted print throughput of output buffers.
// Author: Lukas Bower

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diagchan::{BufferLimits, OutputBuffer};

fn fresh() -> OutputBuffer {
    OutputBuffer::with_limits(BufferLimits::default()).expect("buffer")
}

fn bench_append_string(c: &mut Criterion) {
    c.bench_function("append_string", |b| {
        b.iter(|| {
            let buffer = fresh();
            for _ in 0..256 {
                buffer.append_string(black_box("kmalloc: size=128 caller=probe\n"));
            }
            buffer
        });
    });
}

fn bench_append_formatted(c: &mut Criterion) {
    c.bench_function("append_u64_and_hex", |b| {
        b.iter(|| {
            let buffer = fresh();
            for value in 0..256u64 {
                buffer.append_u64(black_box(value << 12), "addr=%#018llx ");
                buffer.append_hex_bytes(black_box(&[0xde_u8, 0xad, 0xbe, 0xef][..]));
            }
            buffer
        });
    });
}

criterion_group!(benches, bench_append_string, bench_append_formatted);
criterion_main!(benches);
