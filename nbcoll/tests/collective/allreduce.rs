use super::helpers::run_collective;
use nbcoll::{Algorithm, CollectiveError, CollectiveKind, DataType, Element, ErrorKind, ReduceOp};

const ALGORITHMS: [Algorithm; 2] = [Algorithm::Ring, Algorithm::RecursiveDoubling];

async fn allreduce_each<T: Element>(
    world: u32,
    count: usize,
    op: ReduceOp,
    algorithm: Algorithm,
    value: fn(u32, usize) -> T,
) -> Vec<Vec<T>> {
    run_collective(world, move |comm| async move {
        let group = comm.group_all().unwrap();
        let mut operation = comm
            .allreduce(&group, count, op, T::DTYPE, Some(algorithm))
            .unwrap();
        let mine: Vec<T> = (0..count).map(|i| value(comm.rank(), i)).collect();
        operation.start(Some(&mine)).unwrap();
        operation.wait_for_completion::<T>().await.unwrap()
    })
    .await
}

#[tokio::test]
async fn test_allreduce_sum_identical_inputs_integer_types() {
    for world in 1..=6u32 {
        for algorithm in ALGORITHMS {
            for count in [0usize, 1, 7] {
                let s = world as i64;

                let out = allreduce_each::<i32>(world, count, ReduceOp::Sum, algorithm, |_, _| 5).await;
                assert!(out.iter().all(|v| v == &vec![5 * s as i32; count]));

                let out = allreduce_each::<i16>(world, count, ReduceOp::Sum, algorithm, |_, _| -3).await;
                assert!(out.iter().all(|v| v == &vec![-3 * s as i16; count]));

                let out =
                    allreduce_each::<i64>(world, count, ReduceOp::Sum, algorithm, |_, _| 1 << 40).await;
                assert!(
                    out.iter().all(|v| v == &vec![(1i64 << 40) * s; count]),
                    "world {world} {algorithm} count {count}"
                );
            }
        }
    }
}

#[tokio::test]
async fn test_allreduce_prod() {
    for world in 1..=5u32 {
        for algorithm in ALGORITHMS {
            let out = allreduce_each::<i64>(world, 3, ReduceOp::Prod, algorithm, |_, _| 3).await;
            let expected = 3i64.pow(world);
            assert!(out.iter().all(|v| v == &vec![expected; 3]));
        }
    }
}

#[tokio::test]
async fn test_allreduce_min_max_of_ranks() {
    for world in 1..=6u32 {
        for algorithm in ALGORITHMS {
            let min = allreduce_each::<i32>(world, 4, ReduceOp::Min, algorithm, |r, _| r as i32).await;
            let max = allreduce_each::<i32>(world, 4, ReduceOp::Max, algorithm, |r, _| r as i32).await;
            assert!(min.iter().all(|v| v == &vec![0; 4]));
            assert!(max.iter().all(|v| v == &vec![world as i32 - 1; 4]));

            let fmax = allreduce_each::<f32>(world, 2, ReduceOp::Max, algorithm, |r, _| r as f32).await;
            assert!(fmax.iter().all(|v| v == &vec![world as f32 - 1.0; 2]));
        }
    }
}

#[tokio::test]
async fn test_allreduce_float_sum_close_and_consistent() {
    for algorithm in ALGORITHMS {
        let world = 5u32;
        let out = allreduce_each::<f64>(world, 9, ReduceOp::Sum, algorithm, |r, i| {
            0.1 * (r + 1) as f64 + i as f64
        })
        .await;
        for v in &out {
            for (i, x) in v.iter().enumerate() {
                let expected = 0.1 * 15.0 + 5.0 * i as f64;
                assert!((x - expected).abs() < 1e-9, "{algorithm}: {x} vs {expected}");
            }
            assert_eq!(v, &out[0], "members disagree under {algorithm}");
        }
    }
}

#[tokio::test]
async fn test_allreduce_bool_and_or() {
    for algorithm in ALGORITHMS {
        let and = allreduce_each::<bool>(3, 2, ReduceOp::And, algorithm, |r, i| i == 0 || r != 1).await;
        let or = allreduce_each::<bool>(3, 2, ReduceOp::Or, algorithm, |r, i| i == 0 && r == 2).await;
        assert!(and.iter().all(|v| v == &[true, false]));
        assert!(or.iter().all(|v| v == &[true, false]));
    }
}

#[tokio::test]
async fn test_allreduce_default_algorithm_is_ring() {
    let out = run_collective(3, |comm| async move {
        let group = comm.group_all().unwrap();
        let op = comm
            .allreduce(&group, 1, ReduceOp::Sum, DataType::Int, None)
            .unwrap();
        op.algorithm()
    })
    .await;
    assert!(out.iter().all(|&a| a == Algorithm::Ring));
}

#[tokio::test]
async fn test_allreduce_and_on_float_is_configuration_error() {
    run_collective(2, |comm| async move {
        let group = comm.group_all().unwrap();
        for algorithm in ALGORITHMS {
            let err = comm
                .allreduce(&group, 4, ReduceOp::And, DataType::Float, Some(algorithm))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert!(matches!(
                err,
                CollectiveError::IncompatibleReduceOp {
                    op: ReduceOp::And,
                    dtype: DataType::Float
                }
            ));
        }
        let err = comm
            .allreduce(&group, 4, ReduceOp::Sum, DataType::Bool, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_unregistered_algorithm() {
    run_collective(1, |comm| async move {
        let group = comm.group_all().unwrap();
        let err = comm
            .allreduce(&group, 1, ReduceOp::Sum, DataType::Int, Some(Algorithm::Linear))
            .unwrap_err();
        assert!(matches!(
            err,
            CollectiveError::UnknownAlgorithm {
                kind: CollectiveKind::Allreduce,
                dtype: DataType::Int,
                algorithm: Algorithm::Linear
            }
        ));
    })
    .await;
}

#[tokio::test]
async fn test_allreduce_concurrent_operations_on_one_group() {
    let out = run_collective(4, |comm| async move {
        let group = comm.group_all().unwrap();
        let mut sum = comm
            .allreduce(&group, 2, ReduceOp::Sum, DataType::Long, None)
            .unwrap();
        let mut max = comm
            .allreduce(&group, 2, ReduceOp::Max, DataType::Long, Some(Algorithm::RecursiveDoubling))
            .unwrap();
        let mine = [comm.rank() as i64, 1];
        sum.start(Some(&mine)).unwrap();
        max.start(Some(&mine)).unwrap();

        let max = max.wait_for_completion::<i64>().await.unwrap();
        let sum = sum.wait_for_completion::<i64>().await.unwrap();
        (sum, max)
    })
    .await;
    for (sum, max) in out {
        assert_eq!(sum, vec![6, 4]);
        assert_eq!(max, vec![3, 1]);
    }
}
