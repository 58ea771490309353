pub mod intake;
pub mod local;
pub mod ownership;
pub mod probe;
pub mod resolver;
pub mod s3;
pub mod storage;

pub use intake::{UploadIntake, UploadPolicy};
pub use local::LocalStore;
pub use probe::{FfprobeCommand, MediaProbe};
pub use resolver::AssetResolver;
pub use s3::S3Service;
pub use storage::{build_store, AssetStore, StorageError};
