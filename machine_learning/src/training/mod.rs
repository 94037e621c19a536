mod checkpoint;
mod replica;
mod zo_trainer;

pub use checkpoint::Checkpoint;
pub use replica::Replica;
pub use zo_trainer::ZoTrainer;
