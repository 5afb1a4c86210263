mod communicator;
mod sync_client;

pub use communicator::Communicator;
pub use sync_client::SyncCommunicator;
