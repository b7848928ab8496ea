pub mod adapters;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod fs;
pub mod model;
pub mod util;
pub mod visibility;

pub use adapters::ObjectClient;
pub use config::{AdapterOptions, WriteConfig};
pub use error::{FilesystemError, Result};
pub use filesystem::{
    ChecksumProvider, FilesystemAdapter, PublicUrlGenerator, TemporaryUrlGenerator,
};
pub use fs::OssAdapter;
pub use model::fs::{Expiration, StorageAttributes, Visibility};
