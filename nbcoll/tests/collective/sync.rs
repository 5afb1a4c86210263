use nbcoll::{Algorithm, DataType, ReduceOp, SyncCommunicator};
use std::thread;

/// Run `f` on one OS thread per rank.
fn run_threads<F, T>(world_size: u32, f: F) -> Vec<T>
where
    F: Fn(SyncCommunicator) -> T + Send + Sync + Copy + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = SyncCommunicator::bootstrap_local(world_size)
        .unwrap()
        .into_iter()
        .map(|comm| thread::spawn(move || f(comm)))
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn test_sync_allreduce_across_threads() {
    let out = run_threads(4, |comm| {
        let group = comm.group_all().unwrap();
        let mut op = comm
            .allreduce(&group, 3, ReduceOp::Sum, DataType::Int, Some(Algorithm::RecursiveDoubling))
            .unwrap();
        comm.start(&mut op, Some(&[1i32, 2, 3])).unwrap();
        comm.wait_for_completion::<i32>(&mut op).unwrap()
    });
    assert!(out.iter().all(|v| v == &[4, 8, 12]));
}

#[test]
fn test_sync_broadcast_and_allgatherv() {
    let out = run_threads(3, |comm| {
        let group = comm.group_all().unwrap();

        let mut bcast = comm
            .broadcast(&group, 2, 1, DataType::Float, Some(Algorithm::Linear))
            .unwrap();
        let mine = [comm.rank() as f32, 0.5];
        comm.start(&mut bcast, Some(&mine)).unwrap();
        let root_data = comm.wait_for_completion::<f32>(&mut bcast).unwrap();

        let mut gather = comm.allgatherv(&group, 1, DataType::Float, None).unwrap();
        comm.start(&mut gather, Some(&[comm.rank() as f32])).unwrap();
        let gathered = comm.wait_for_completion::<f32>(&mut gather).unwrap();

        comm.barrier(&group).unwrap();
        (root_data, gathered)
    });
    for (root_data, gathered) in out {
        assert_eq!(root_data, vec![1.0, 0.5]);
        assert_eq!(gathered, vec![0.0, 1.0, 2.0]);
    }
}

#[test]
fn test_sync_accessors() {
    let comms = SyncCommunicator::bootstrap_local(2).unwrap();
    assert_eq!(comms[1].rank(), 1);
    assert_eq!(comms[1].size(), 2);
    assert_eq!(comms[1].inner().rank(), 1);
    assert!(comms[0].group([1]).is_err());
}
