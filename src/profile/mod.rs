//! Connection profiles and their encrypted on-disk store.

mod model;
mod store;
mod validate;

pub use model::{
    ConnectionOptions, ConnectionProfile, Environment, MetadataUpdate, ProfileMetadata,
    ProfileStorage, ProfileUpdate, STORAGE_VERSION, StoredProfile,
};
pub use store::ProfileStore;
pub use validate::{URI_SCHEMES, normalize_uri, validate_name, validate_profile, validate_uri};
