use super::helpers::run_collective;
use nbcoll::{CollectiveError, DataType};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::test]
async fn test_barrier_waits_for_every_member() {
    for world in [1u32, 2, 3, 6] {
        let arrived = Arc::new(AtomicUsize::new(0));
        let seen = run_collective(world, {
            let arrived = Arc::clone(&arrived);
            move |comm| {
                let arrived = Arc::clone(&arrived);
                async move {
                    let group = comm.group_all().unwrap();
                    // Stagger arrivals.
                    for _ in 0..comm.rank() {
                        tokio::task::yield_now().await;
                    }
                    arrived.fetch_add(1, Ordering::SeqCst);
                    comm.barrier(&group).await.unwrap();
                    arrived.load(Ordering::SeqCst)
                }
            }
        })
        .await;
        assert!(seen.iter().all(|&n| n == world as usize), "world {world}: {seen:?}");
    }
}

#[tokio::test]
async fn test_barrier_between_operations() {
    let out = run_collective(3, |comm| async move {
        let group = comm.group([0, 2, 1]).unwrap();
        comm.barrier(&group).await.unwrap();
        let mut op = comm.allgatherv(&group, 1, DataType::Int, None).unwrap();
        op.start(Some(&[comm.rank() as i32])).unwrap();
        let gathered = op.wait_for_completion::<i32>().await.unwrap();
        comm.barrier(&group).await.unwrap();
        gathered
    })
    .await;
    assert!(out.iter().all(|v| v == &[0, 2, 1]));
}

#[tokio::test]
async fn test_barrier_rejects_foreign_group() {
    let comms = nbcoll::Communicator::bootstrap_local(2).unwrap();
    let group = comms[0].group_all().unwrap();
    let err = comms[1].barrier(&group).await.unwrap_err();
    assert!(matches!(err, CollectiveError::NotAMember { rank: 1, .. }));
}
