//! Integration tests covering batch partitioning and score reassembly.

use pplcsv_core::{
    BatchScorer, BatchScorerBuilder, ExecutionStrategy, PplError, ScorerError, ScorerErrorCode,
};
use pplcsv_test_support::scorers::{FailingScorer, LengthScorer, TableScorer};
use proptest::prelude::*;
use rstest::{fixture, rstest};

fn runner(batch_size: usize, strategy: ExecutionStrategy) -> BatchScorer {
    BatchScorerBuilder::new()
        .with_batch_size(batch_size)
        .with_execution_strategy(strategy)
        .build()
        .expect("builder must succeed")
}

#[fixture]
fn sentences() -> Vec<String> {
    vec!["hello world".to_owned(), "the cat sat".to_owned()]
}

#[fixture]
fn table() -> TableScorer {
    TableScorer::new("gpt2", [("hello world", 10.5), ("the cat sat", 22.3)])
}

#[rstest]
fn single_row_batches_keep_row_order(sentences: Vec<String>, table: TableScorer) {
    let scores = runner(1, ExecutionStrategy::Sequential)
        .run(&table, "gpt2", &sentences)
        .expect("run must succeed");

    assert_eq!(scores.values(), [10.5, 22.3]);
    assert_eq!(
        table.batches(),
        vec![vec!["hello world".to_owned()], vec!["the cat sat".to_owned()]]
    );
}

#[rstest]
#[case(2)]
#[case(3)]
#[case(1_000)]
fn oversized_batch_behaves_like_single_batch(
    sentences: Vec<String>,
    table: TableScorer,
    #[case] batch_size: usize,
) {
    let scores = runner(batch_size, ExecutionStrategy::Sequential)
        .run(&table, "gpt2", &sentences)
        .expect("run must succeed");

    assert_eq!(scores.values(), [10.5, 22.3]);
    assert_eq!(table.batches(), vec![sentences]);
}

#[rstest]
fn unknown_model_is_reported_with_scorer_code(sentences: Vec<String>, table: TableScorer) {
    let err = runner(1, ExecutionStrategy::Sequential)
        .run(&table, "opt-125m", &sentences)
        .expect_err("unknown model must fail");

    assert_eq!(err.scorer_code(), Some(ScorerErrorCode::UnknownModel));
    assert!(matches!(err, PplError::Scorer { batch: 0, .. }));
    assert_eq!(table.batches().len(), 1, "run must stop after the first failure");
}

fn assert_transport_failure_aborts(sentences: &[String], strategy: ExecutionStrategy) {
    let scorer = FailingScorer::new(ScorerError::Transport {
        message: "connection refused".to_owned(),
    });

    let err = runner(1, strategy)
        .run(&scorer, "gpt2", sentences)
        .expect_err("failing backend must abort the run");

    assert_eq!(err.scorer_code(), Some(ScorerErrorCode::Transport));
}

#[rstest]
fn backend_failure_aborts_sequential_run(sentences: Vec<String>) {
    assert_transport_failure_aborts(&sentences, ExecutionStrategy::Sequential);
}

#[cfg(feature = "parallel")]
#[rstest]
fn backend_failure_aborts_parallel_run(sentences: Vec<String>) {
    assert_transport_failure_aborts(&sentences, ExecutionStrategy::Parallel);
}

fn texts() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z ]{0,12}", 0..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn chunked_scoring_matches_single_batch(rows in texts(), batch_size in 1_usize..80) {
        let whole = runner(rows.len().max(1), ExecutionStrategy::Sequential)
            .run(&LengthScorer, "any", &rows)
            .expect("single batch run must succeed");
        let chunked = runner(batch_size, ExecutionStrategy::Sequential)
            .run(&LengthScorer, "any", &rows)
            .expect("chunked run must succeed");

        prop_assert_eq!(chunked.len(), rows.len());
        prop_assert_eq!(chunked.values(), whole.values());
        for (row, score) in rows.iter().zip(chunked.iter()) {
            prop_assert_eq!(*score, row.chars().count() as f64);
        }
    }

    #[test]
    fn batch_count_covers_every_row(rows in 0_usize..500, batch_size in 1_usize..64) {
        let batches = runner(batch_size, ExecutionStrategy::Sequential).batch_count(rows);
        prop_assert!(batches * batch_size >= rows);
        prop_assert!(batches == 0 || (batches - 1) * batch_size < rows);
    }
}

#[cfg(feature = "parallel")]
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parallel_scoring_matches_sequential(rows in texts(), batch_size in 1_usize..16) {
        let sequential = runner(batch_size, ExecutionStrategy::Sequential)
            .run(&LengthScorer, "any", &rows)
            .expect("sequential run must succeed");
        let parallel = runner(batch_size, ExecutionStrategy::Parallel)
            .run(&LengthScorer, "any", &rows)
            .expect("parallel run must succeed");

        prop_assert_eq!(parallel, sequential);
    }
}
