//! Business logic services.

#![allow(missing_docs)]

pub mod auth;
pub mod following;
pub mod media;
pub mod profile;

pub use auth::{AuthService, Claims, JwtTokenService, TokenService};
pub use following::{FollowOutcome, FollowService, UnfollowOutcome};
pub use media::{ImageDimensions, ImageProcessor, ImageService, PictureKind, StoredPicture};
pub use profile::{
    PictureUpload, ProfilePatch, ProfileService, ProfileView, RegisterInput, double_option,
};
