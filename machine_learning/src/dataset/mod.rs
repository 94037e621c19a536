mod csv;
mod dataset;
mod loader;
mod shard;
mod synthetic;

pub use csv::parse_csv;
pub use dataset::Dataset;
pub use loader::CyclicLoader;
pub use shard::shard_range;
pub use synthetic::gaussian_blobs;
