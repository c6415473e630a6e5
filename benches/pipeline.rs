//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.


//! Pipeline benchmarks (criterion) over a generated in-memory table.
//!
//! `BENCH_ROWS` overrides the table size (default 100k rows).

use criterion::{criterion_group, criterion_main, Criterion, SamplingMode};
use std::time::Duration;

use recruit_query::sql::Database;
use recruit_query::{Table, Value};

fn bench_rows() -> usize {
    std::env::var("BENCH_ROWS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(100_000)
}

/// Columns: id1 (100 distinct text keys), id2 (10 int keys), v1 int, v2 float.
fn generate(nrows: usize) -> Table {
    let rows = (0..nrows)
        .map(|i| {
            vec![
                Value::text(format!("id{:03}", i % 100)),
                Value::Int((i % 10) as i64),
                Value::Int((i * 7 % 13) as i64),
                Value::Float((i % 1000) as f64 / 10.0),
            ]
        })
        .collect();
    Table::with_rows(["id1", "id2", "v1", "v2"], rows).unwrap()
}

fn setup() -> Database {
    let mut db = Database::new();
    db.register("t", generate(bench_rows()));
    db
}

fn bench_pipeline(c: &mut Criterion) {
    let mut db = setup();

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.sampling_mode(SamplingMode::Flat);
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_secs(2));

    group.bench_function("filter", |b| {
        b.iter(|| db.execute("SELECT id1, v1 FROM t WHERE v2 > 50.0").unwrap())
    });

    group.bench_function("group_sum", |b| {
        b.iter(|| {
            db.execute("SELECT id1, sum(v1) AS v1 FROM t GROUP BY id1")
                .unwrap()
        })
    });

    group.bench_function("group_two_keys", |b| {
        b.iter(|| {
            db.execute("SELECT id1, id2, sum(v1), avg(v2) FROM t GROUP BY id1, id2")
                .unwrap()
        })
    });

    group.bench_function("group_having_order", |b| {
        b.iter(|| {
            db.execute(
                "SELECT id2, count(*) AS n FROM t GROUP BY id2 HAVING avg(v2) > 40 ORDER BY n DESC",
            )
            .unwrap()
        })
    });

    group.bench_function("order_limit", |b| {
        b.iter(|| {
            db.execute("SELECT id1, v2 FROM t ORDER BY v2 DESC, id1 LIMIT 10")
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
