use criterion::{Criterion, black_box, criterion_group, criterion_main};

use libsoulpsx::cpu::EmulationBackend;
use libsoulpsx::r3000::{Instruction, Interpreter, Opcode, R3000};
use libsoulpsx::{BIOS, Bus};

// addiu $t0, $t0, 1 ; addu $t1, $t1, $t0 ; sw $t1, 0x100($zero) ; lw $t2, 0x100($zero)
// bne $t0, $zero, -5 ; nop
const LOOP: [u32; 6] = [
    0x2508_0001,
    0x0128_4821,
    0xAC09_0100,
    0x8C0A_0100,
    0x1500_FFFB,
    0x0000_0000,
];

const DECODE_SAMPLE: [u32; 8] = [
    0x3C08_0013,
    0x3508_243F,
    0x27BD_FFE8,
    0x8FA8_0004,
    0x1509_FFFE,
    0x408C_6000,
    0x0109_5021,
    0x4200_0010,
];

fn bench_decode(c: &mut Criterion) {
    c.bench_function("decode", |b| {
        b.iter(|| {
            for word in DECODE_SAMPLE {
                black_box(Opcode::decode(black_box(word)));
            }
        })
    });

    c.bench_function("disassemble", |b| {
        b.iter(|| {
            for word in DECODE_SAMPLE {
                black_box(Instruction::new(black_box(word)).to_string());
            }
        })
    });
}

fn bench_step(c: &mut Criterion) {
    let bus = Bus::new(BIOS::from_words(&LOOP)).expect("Failed to create bus");
    let mut interpreter = Interpreter::new(R3000::new(bus));

    c.bench_function("step_1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                interpreter.step().expect("step failed");
            }
        })
    });
}

criterion_group!(benches, bench_decode, bench_step);
criterion_main!(benches);
