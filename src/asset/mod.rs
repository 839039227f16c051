//! Container image asset model and publishing

pub mod descriptor;
pub mod manifest;
pub mod publisher;

pub use descriptor::{
    Addressing, AssetDescriptor, ParameterUpdate, PublishResult, DEFAULT_IMAGE_TAG,
};
pub use manifest::AssetManifest;
pub use publisher::AssetPublisher;
