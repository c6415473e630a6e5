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


//! End-to-end pipeline tests against the structured query API.

use recruit_query::expr::{extract_tokens, is_all_tokens_in_aggregate};
use recruit_query::grouping::generate_groups;
use recruit_query::ordering::RowOrdering;
use recruit_query::{Catalog, Error, Expr, OrderKey, Query, Session, Table, Token, Value};

fn col(name: &str) -> Expr {
    Expr::col(name)
}

fn ints(rows: &[&[i64]]) -> Vec<Vec<Value>> {
    rows.iter()
        .map(|r| r.iter().map(|&v| Value::Int(v)).collect())
        .collect()
}

/// `a`, `b` pairs: (1,1) (1,1) (3,2) plus a spare `c` column.
fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.register(
        "t",
        Table::with_rows(["a", "b", "c"], ints(&[&[1, 1, 7], &[1, 1, 8], &[3, 2, 9]])).unwrap(),
    );
    catalog.register(
        "ten",
        Table::with_rows(["n"], (0..10).map(|i| vec![Value::Int(i)]).collect()).unwrap(),
    );
    catalog
}

// ---------------------------------------------------------------------------
// Building blocks
// ---------------------------------------------------------------------------

#[test]
fn slice_and_chain_restore_table() {
    let t = Table::with_rows(["x", "y", "z"], ints(&[&[1, 2, 3], &[4, 5, 6]])).unwrap();
    for k in 0..=3 {
        let joined = t.slice_col(0, k).chain(&t.slice_col(k, 3)).unwrap();
        assert_eq!(joined, t, "split at {k}");
    }
}

#[test]
fn chain_rejects_unequal_lengths() {
    let left = Table::with_rows(["x"], ints(&[&[1], &[2]])).unwrap();
    let right = Table::with_rows(["y"], ints(&[&[1]])).unwrap();
    assert!(matches!(
        left.chain(&right),
        Err(Error::RowCountMismatch { left: 2, right: 1 })
    ));
}

#[test]
fn groups_partition_rows_by_trailing_key() {
    let t = Table::with_rows(
        ["v", "k"],
        ints(&[&[10, 1], &[20, 2], &[30, 1], &[40, 3], &[50, 2]]),
    )
    .unwrap();
    let groups = generate_groups(&t, &[col("k")]).unwrap();

    assert_eq!(groups.len(), 3);
    assert_eq!(groups.iter().map(Table::len).sum::<usize>(), t.len());
    let firsts: Vec<Value> = groups.iter().map(|g| g.rows()[0][0].clone()).collect();
    assert_eq!(firsts, vec![Value::Int(10), Value::Int(20), Value::Int(40)]);
    assert!(groups.iter().all(|g| g.fields() == ["v"]));
}

#[test]
fn row_ordering_is_stable() {
    let t = Table::with_rows(
        ["k", "seq"],
        ints(&[&[2, 0], &[1, 1], &[2, 2], &[1, 3], &[2, 4]]),
    )
    .unwrap();
    let keys = [OrderKey::asc(col("k"))];
    let sorted = RowOrdering::new(&keys).sort(&t).unwrap();
    let seq: Vec<Value> = sorted.column(1).cloned().collect();
    assert_eq!(seq, ints(&[&[1, 3, 0, 2, 4]])[0]);
}

#[test]
fn aggregate_token_coverage() {
    let sum_a = Expr::call("sum", vec![col("a")]);
    assert!(is_all_tokens_in_aggregate([&sum_a, &Expr::lit(1)]));
    assert!(!is_all_tokens_in_aggregate([&sum_a, &col("b")]));
    let mixed = Expr::binary("+", sum_a.clone(), col("a"));
    assert!(!is_all_tokens_in_aggregate([&mixed]));
}

#[test]
fn wildcard_absorbs_other_tokens() {
    let tokens = extract_tokens(&[Expr::Wildcard, col("a")]);
    assert!(tokens.is_wildcard());
    assert_eq!(tokens.len(), 1);
    assert!(tokens.contains(&Token::Wildcard));
}

// ---------------------------------------------------------------------------
// Whole queries
// ---------------------------------------------------------------------------

#[test]
fn group_count_ordered_by_count_desc() {
    let catalog = catalog();
    let count_a = Expr::call("count", vec![col("a")]);
    let q = Query::select(vec![col("a"), count_a.clone()])
        .from_label("t")
        .group_by(vec![col("b")])
        .order_by(vec![OrderKey::desc(count_a)]);
    let out = Session::new(&catalog).execute(&q).unwrap();
    assert_eq!(out.fields(), ["a", "count(a)"]);
    assert_eq!(out.rows(), ints(&[&[1, 2], &[3, 1]]).as_slice());
}

#[test]
fn filter_matching_nothing_yields_labels_only() {
    let catalog = catalog();
    let q = Query::select(vec![col("a"), col("c")])
        .from_label("t")
        .filter(Expr::binary(">", col("c"), Expr::lit(100)));
    let out = Session::new(&catalog).execute(&q).unwrap();
    assert!(out.is_empty());
    assert_eq!(out.fields(), ["a", "c"]);
}

#[test]
fn limit_keeps_prefix() {
    let catalog = catalog();
    let q = Query::select(vec![col("n")]).from_label("ten").limit(3);
    let out = Session::new(&catalog).execute(&q).unwrap();
    assert_eq!(out.rows(), ints(&[&[0], &[1], &[2]]).as_slice());
}

#[test]
fn having_drops_groups() {
    let catalog = catalog();
    let q = Query::select(vec![col("b"), Expr::call("sum", vec![col("c")])])
        .from_label("t")
        .group_by(vec![col("b")])
        .having(Expr::binary(
            ">",
            Expr::call("count", vec![Expr::Wildcard]),
            Expr::lit(1),
        ));
    let out = Session::new(&catalog).execute(&q).unwrap();
    assert_eq!(out.rows(), ints(&[&[1, 15]]).as_slice());
}

#[test]
fn nested_query_feeds_outer_query() {
    let catalog = catalog();
    let inner = Query::select(vec![col("n")])
        .from_label("ten")
        .filter(Expr::binary("<", col("n"), Expr::lit(4)));
    let q = Query::select(vec![Expr::call("sum", vec![col("n")])])
        .from_query(inner)
        .with_labels(vec!["total".into()]);
    let out = Session::new(&catalog).execute(&q).unwrap();
    assert_eq!(out.fields(), ["total"]);
    assert_eq!(out.rows(), ints(&[&[6]]).as_slice());
}

#[test]
fn closure_fetcher_sees_relevant_tokens() {
    let fetch = |label: &str, tokens: &recruit_query::TokenSet| -> recruit_query::Result<Table> {
        assert_eq!(label, "people");
        let wanted: Vec<&str> = tokens.columns().collect();
        assert_eq!(wanted, ["age", "name"]);
        Table::with_rows(
            ["age", "name"],
            vec![
                vec![Value::Int(40), Value::text("x")],
                vec![Value::Int(20), Value::text("y")],
            ],
        )
    };
    let q = Query::select(vec![col("age")])
        .from_label("people")
        .order_by(vec![OrderKey::asc(col("name"))])
        .filter(Expr::binary(">", col("age"), Expr::lit(30)));
    let out = Session::new(&fetch).execute(&q).unwrap();
    assert_eq!(out.rows(), ints(&[&[40]]).as_slice());
}

#[test]
fn empty_source_yields_labels_only() {
    let fetch = |_: &str, _: &recruit_query::TokenSet| -> recruit_query::Result<Table> {
        Ok(Table::new(["a", "b"]))
    };
    let session = Session::new(&fetch);

    let all = session
        .execute(&Query::select(vec![Expr::Wildcard]).from_label("empty"))
        .unwrap();
    assert_eq!(all.fields(), ["a", "b"]);
    assert!(all.is_empty());

    let counted = session
        .execute(
            &Query::select(vec![Expr::call("count", vec![Expr::Wildcard])]).from_label("empty"),
        )
        .unwrap();
    assert_eq!(counted.fields(), ["count(*)"]);
    assert!(counted.is_empty());
}

#[test]
fn empty_nested_source_keeps_outer_labels() {
    let catalog = catalog();
    let inner = Query::select(vec![col("n")])
        .from_label("ten")
        .filter(Expr::binary(">", col("n"), Expr::lit(100)));
    let q = Query::select(vec![col("n"), Expr::binary("*", col("n"), Expr::lit(2))])
        .from_query(inner)
        .with_labels(vec!["n".into(), "twice".into()]);
    let out = Session::new(&catalog).execute(&q).unwrap();
    assert_eq!(out.fields(), ["n", "twice"]);
    assert!(out.is_empty());
}
