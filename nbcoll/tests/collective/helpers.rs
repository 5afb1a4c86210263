use nbcoll::{CollConfig, Communicator};
use std::future::Future;
use std::sync::Arc;

/// Run `f` once per rank of a fresh in-process world, concurrently, and
/// return the per-rank outputs in rank order. Every communicator stays alive
/// until all ranks have finished.
pub async fn run_collective<F, Fut, T>(world_size: u32, f: F) -> Vec<T>
where
    F: Fn(Arc<Communicator>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let comms = Communicator::bootstrap_local_with_config(world_size, CollConfig::default())
        .unwrap();
    let comms: Vec<Arc<Communicator>> = comms.into_iter().map(Arc::new).collect();

    let f = Arc::new(f);
    let mut handles = Vec::new();
    for c in &comms {
        let c = Arc::clone(c);
        let f = Arc::clone(&f);
        handles.push(tokio::spawn(async move { f(c).await }));
    }
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(h.await.unwrap());
    }
    out
}
