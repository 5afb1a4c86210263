use super::helpers::run_collective;
use nbcoll::{Algorithm, CollectiveError, DataType};

#[tokio::test]
async fn test_allgatherv_equal_counts() {
    for world in 1..=5u32 {
        for count in [0usize, 1, 3] {
            let out = run_collective(world, move |comm| async move {
                let group = comm.group_all().unwrap();
                let mut op = comm.allgatherv(&group, count, DataType::Int, None).unwrap();
                let mine = vec![comm.rank() as i32; count];
                op.start(Some(&mine)).unwrap();
                op.wait_for_completion::<i32>().await.unwrap()
            })
            .await;

            let expected: Vec<i32> = (0..world as i32)
                .flat_map(|r| std::iter::repeat_n(r, count))
                .collect();
            assert_eq!(expected.len(), world as usize * count);
            for got in out {
                assert_eq!(got, expected, "world {world} count {count}");
            }
        }
    }
}

#[tokio::test]
async fn test_allgatherv_variable_counts() {
    // Rank r contributes r elements, so rank 0 sends an empty segment.
    let out = run_collective(5, |comm| async move {
        let group = comm.group_all().unwrap();
        let r = comm.rank() as usize;
        let mut op = comm
            .allgatherv(&group, r, DataType::Double, Some(Algorithm::Ring))
            .unwrap();
        let mine: Vec<f64> = (0..r).map(|i| r as f64 + i as f64 / 10.0).collect();
        op.start(Some(&mine)).unwrap();
        op.wait_for_completion::<f64>().await.unwrap()
    })
    .await;

    let expected: Vec<f64> = (0..5usize)
        .flat_map(|r| (0..r).map(move |i| r as f64 + i as f64 / 10.0))
        .collect();
    assert_eq!(expected.len(), 10);
    for got in out {
        assert_eq!(got, expected);
    }
}

#[tokio::test]
async fn test_allgatherv_follows_group_order() {
    let out = run_collective(3, |comm| async move {
        let group = comm.group([2, 0, 1]).unwrap();
        let mut op = comm.allgatherv(&group, 1, DataType::Bool, None).unwrap();
        op.start(Some(&[comm.rank() == 2])).unwrap();
        op.wait_for_completion::<bool>().await.unwrap()
    })
    .await;
    for got in out {
        assert_eq!(got, vec![true, false, false]);
    }
}

#[tokio::test]
async fn test_allgatherv_only_linear_is_unregistered() {
    run_collective(1, |comm| async move {
        let group = comm.group_all().unwrap();
        let err = comm
            .allgatherv(&group, 1, DataType::Int, Some(Algorithm::Linear))
            .unwrap_err();
        assert!(matches!(err, CollectiveError::UnknownAlgorithm { .. }));
    })
    .await;
}
