pub mod asset;
pub mod user;
pub mod video;

pub use asset::{AssetReference, StoredAsset};
pub use user::User;
pub use video::{AssetSlot, NewVideo, SlotUpdate, VideoRecord, VideoResponse};
