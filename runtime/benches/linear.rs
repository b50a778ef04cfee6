use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use relin_runtime::*;

/// (a+b) as a hand-assembled program.
fn repeating_a_program() -> Instructions {
    Instructions::default().with_opcodes(vec![
        Opcode::StartSave(InstStartSave::new(0)),
        Opcode::Consume(InstConsume::new('a')),
        Opcode::Split(InstSplit::new(InstIndex::from(1), InstIndex::from(3))),
        Opcode::Consume(InstConsume::new('b')),
        Opcode::EndSave(InstEndSave::new(0)),
        Opcode::Match,
    ])
}

fn haystack_of(len: usize) -> Vec<u8> {
    let mut haystack = vec![b'a'; len.saturating_sub(1)];
    haystack.push(b'b');
    haystack
}

fn search_scales_linearly_with_input(c: &mut Criterion) {
    let program = repeating_a_program();

    let mut group = c.benchmark_group("search scales linearly with input");
    for size in [1usize << 10, 1 << 14, 1 << 18] {
        let haystack = haystack_of(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &haystack, |b, h| {
            b.iter(|| program.search(h, 0))
        });
    }
    group.finish();
}

fn fast_forward_skips_dead_prefixes(c: &mut Criterion) {
    let program = repeating_a_program().with_fast_forward(FastForward::Char('a'));

    let mut group = c.benchmark_group("fast forward skips dead prefixes");
    for size in [1usize << 14, 1 << 18] {
        // a long irrelevant prefix followed by the only match.
        let mut haystack = vec![b'x'; size];
        haystack.extend_from_slice(b"aab");

        group.throughput(Throughput::Bytes(haystack.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &haystack, |b, h| {
            b.iter(|| program.search(h, 0))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    search_scales_linearly_with_input,
    fast_forward_skips_dead_prefixes
);
criterion_main!(benches);
