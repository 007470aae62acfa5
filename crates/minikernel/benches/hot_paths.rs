use criterion::{Criterion, black_box, criterion_group, criterion_main};
use minikernel::{Workspace, parse_to_record};

fn long_program() -> String {
    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(
            "row_{i} = {{'id': {i}, 'name': 'n{i}', 'score': {i} * 1.5, 'tags': [1, 2, 3]}}\n"
        ));
        source.push_str(&format!("if row_{i}['score'] > 10 and not row_{i}['tags']:\n    pass\n"));
    }
    source
}

fn bench_parse_encode(c: &mut Criterion) {
    let source = long_program();

    c.bench_function("parse_to_record", |b| {
        b.iter(|| parse_to_record(black_box(&source)).unwrap())
    });
}

fn bench_execute_loop(c: &mut Criterion) {
    let source = "total = 0\nfor i in range(10000):\n    if i % 3 == 0:\n        total += i\n";

    c.bench_function("execute_loop", |b| {
        b.iter(|| {
            let mut ws = Workspace::new();
            ws.execute(black_box(source)).unwrap();
        })
    });
}

fn bench_frame_eval(c: &mut Criterion) {
    let mut ws = Workspace::new();
    ws.execute("df = pd.DataFrame({'x': list(range(10000)), 'y': list(range(10000))})")
        .unwrap();

    c.bench_function("evaluate_frame_head", |b| {
        b.iter(|| {
            ws.evaluate_json(black_box("df.sort_values('y', ascending=False).head(100)"))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_parse_encode, bench_execute_loop, bench_frame_eval);
criterion_main!(benches);
