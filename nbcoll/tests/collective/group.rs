use super::helpers::run_collective;
use nbcoll::{CollConfig, CollectiveError, Communicator, DataType, ErrorKind, ReduceOp};

#[tokio::test]
async fn test_group_all_is_every_rank() {
    run_collective(4, |comm| async move {
        let group = comm.group_all().unwrap();
        assert_eq!(group.ranks(), &[0, 1, 2, 3]);
        assert_eq!(group.size(), 4);
        assert_eq!(group.local_rank(), comm.rank() as usize);
    })
    .await;
}

#[tokio::test]
async fn test_contains_is_stable_across_operations() {
    run_collective(3, |comm| async move {
        if comm.rank() == 1 {
            return;
        }
        let group = comm.group([2, 0]).unwrap();
        let before: Vec<bool> = (0..3).map(|r| group.contains(r)).collect();

        let mut op = comm
            .allreduce(&group, 1, ReduceOp::Sum, DataType::Int, None)
            .unwrap();
        op.start(Some(&[1i32])).unwrap();
        assert_eq!(op.wait_for_completion::<i32>().await.unwrap(), vec![2]);

        let after: Vec<bool> = (0..3).map(|r| group.contains(r)).collect();
        assert_eq!(before, vec![true, false, true]);
        assert_eq!(before, after);
    })
    .await;
}

#[test]
fn test_group_validation() {
    let comms = Communicator::bootstrap_local_with_config(3, CollConfig::default()).unwrap();
    let comm = &comms[1];

    let err = comm.group([]).unwrap_err();
    assert!(matches!(err, CollectiveError::EmptyGroup));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = comm.group([0, 2]).unwrap_err();
    assert!(matches!(err, CollectiveError::NotAMember { rank: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = comm.group([1, 3]).unwrap_err();
    assert!(matches!(err, CollectiveError::InvalidRank { rank: 3, size: 3 }));
}

#[test]
fn test_group_dedups_keeping_first_occurrence() {
    let comms = Communicator::bootstrap_local_with_config(3, CollConfig::default()).unwrap();
    let group = comms[0].group([2, 0, 2, 0, 1]).unwrap();
    assert_eq!(group.ranks(), &[2, 0, 1]);
    assert_eq!(group.local_rank(), 1);
    assert_eq!(group.global_rank(0), Some(2));
    assert_eq!(group.local_rank_of(1), Some(2));
}

#[test]
fn test_group_from_other_rank_is_rejected() {
    let comms = Communicator::bootstrap_local_with_config(2, CollConfig::default()).unwrap();
    let foreign = comms[0].group_all().unwrap();
    let err = comms[1]
        .allgatherv(&foreign, 1, DataType::Int, None)
        .unwrap_err();
    assert!(matches!(err, CollectiveError::NotAMember { rank: 1, .. }));
}

#[tokio::test]
async fn test_same_rank_list_twice_keeps_traffic_apart() {
    let out = run_collective(3, |comm| async move {
        let first = comm.group_all().unwrap();
        let second = comm.group_all().unwrap();
        assert_ne!(first.id(), second.id());

        let mut a = comm
            .allreduce(&first, 1, ReduceOp::Sum, DataType::Int, None)
            .unwrap();
        let mut b = comm
            .allreduce(&second, 1, ReduceOp::Sum, DataType::Int, None)
            .unwrap();
        // Start in opposite orders on different ranks.
        if comm.rank() % 2 == 0 {
            a.start(Some(&[1i32])).unwrap();
            b.start(Some(&[100i32])).unwrap();
        } else {
            b.start(Some(&[100i32])).unwrap();
            a.start(Some(&[1i32])).unwrap();
        }
        let b = b.wait_for_completion::<i32>().await.unwrap();
        let a = a.wait_for_completion::<i32>().await.unwrap();
        (a, b)
    })
    .await;
    for (a, b) in out {
        assert_eq!(a, vec![3]);
        assert_eq!(b, vec![300]);
    }
}

#[tokio::test]
async fn test_disjoint_groups_run_side_by_side() {
    let out = run_collective(4, |comm| async move {
        let members = if comm.rank() < 2 { [0, 1] } else { [2, 3] };
        let group = comm.group(members).unwrap();
        let mut op = comm
            .allreduce(&group, 1, ReduceOp::Sum, DataType::Long, None)
            .unwrap();
        op.start(Some(&[comm.rank() as i64])).unwrap();
        op.wait_for_completion::<i64>().await.unwrap()
    })
    .await;
    assert_eq!(out, vec![vec![1], vec![1], vec![5], vec![5]]);
}
