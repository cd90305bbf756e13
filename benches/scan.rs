//! Benchmarks for the literal scanner and patcher.
//!
//! Uses a synthetic in-memory module with many methods, each holding a few encoded literals
//! between unrelated instructions.

extern crate cilb64;

use cilb64::{assembly::decode_raw_stream, prelude::*};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;

const METHODS: u32 = 500;

fn from_base64() -> Operand {
    Operand::Member(MemberRef::new(
        Token::from_parts(0x0A, 1),
        "System.Convert",
        "FromBase64String",
    ))
}

fn synthetic_module() -> Module {
    let methods = (1..=METHODS)
        .map(|row| {
            let mut instructions = Vec::new();
            let mut offset = 0;
            for literal in ["SGVsbG8=", "V29ybGQ=", "bm90IGEgc2VjcmV0"] {
                instructions.push(Instruction::new(offset, OpCode::NOP, Operand::None));
                instructions.push(Instruction::new(
                    offset + 1,
                    OpCode::LDSTR,
                    Operand::String(literal.to_string()),
                ));
                instructions.push(Instruction::new(offset + 6, OpCode::CALL, from_base64()));
                instructions.push(Instruction::new(offset + 11, OpCode::POP, Operand::None));
                offset += 12;
            }
            instructions.push(Instruction::new(offset, OpCode::RET, Operand::None));

            Method::new(
                Token::from_parts(0x06, row),
                "Method",
                Some(MethodBody::from_instructions(instructions)),
            )
        })
        .collect();

    Module::new(vec![TypeDef::new(
        Token::from_parts(0x02, 2),
        "Bench",
        "Program",
        methods,
    )])
}

/// Benchmark scanning without mutation.
fn bench_scan(c: &mut Criterion) {
    let module = synthetic_module();

    c.bench_function("scan_synthetic", |b| {
        b.iter(|| {
            let matches = scan(black_box(&module));
            black_box(matches)
        });
    });
}

/// Benchmark scan, decode and patch on a fresh module per iteration.
fn bench_decode_module(c: &mut Criterion) {
    c.bench_function("decode_module_synthetic", |b| {
        b.iter_batched(
            synthetic_module,
            |mut module| {
                let report = decode_module(&mut module);
                black_box(report)
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark raw decoding of a code stream.
fn bench_decode_raw(c: &mut Criterion) {
    // ldstr 0x70000001; call 0x0A000001; pop; ret
    let mut code = Vec::new();
    for _ in 0..1000 {
        code.extend_from_slice(&[0x72, 0x01, 0x00, 0x00, 0x70]);
        code.extend_from_slice(&[0x28, 0x01, 0x00, 0x00, 0x0A]);
        code.push(0x26);
    }
    code.push(0x2A);

    c.bench_function("decode_raw_stream", |b| {
        b.iter(|| {
            let instructions = decode_raw_stream(black_box(&code)).unwrap();
            black_box(instructions)
        });
    });
}

criterion_group!(benches, bench_scan, bench_decode_module, bench_decode_raw);
criterion_main!(benches);
