//! Picture processing: validation, resizing and storage of profile images.

use std::{io::Cursor, path::Path, str::FromStr, sync::Arc};

use cutaway_common::{AppError, AppResult, StorageBackend, generate_storage_key};
use image::{DynamicImage, ImageFormat, ImageReader, imageops::FilterType};

/// Edge length of a stored avatar.
pub const AVATAR_SIZE: u32 = 512;

/// Width of a stored background picture.
pub const BACKGROUND_WIDTH: u32 = 1024;

/// Which profile picture an upload replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureKind {
    /// Square profile picture.
    Avatar,
    /// Square or landscape header picture.
    Background,
}

impl PictureKind {
    /// Storage directory for this kind.
    #[must_use]
    pub const fn directory(&self) -> &'static str {
        match self {
            Self::Avatar => "avatars",
            Self::Background => "bg-pictures",
        }
    }

    /// Wire name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::Background => "background",
        }
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Avatar => "Avatar",
            Self::Background => "Background",
        }
    }

    /// Reject pictures whose shape does not fit this kind.
    pub fn check_shape(&self, dimensions: ImageDimensions) -> AppResult<()> {
        match self {
            Self::Avatar if !dimensions.is_square() => Err(AppError::Validation(
                "The picture should be squared".to_string(),
            )),
            Self::Background if !(dimensions.is_square() || dimensions.is_landscape()) => Err(
                AppError::Validation("The picture should be squared or landscape".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Storage key of `key` inside this kind's directory, if its file name
    /// marks it as a picture of `owner_id`.
    ///
    /// Stored values can be edited through the profile, so the directory and
    /// the owner prefix are taken from here, never from the value itself.
    #[must_use]
    pub fn owned_key(&self, key: &str, owner_id: i32) -> Option<String> {
        let file_name = Path::new(key).file_name()?.to_str()?;
        file_name
            .starts_with(&format!("{owner_id}_"))
            .then(|| format!("{}/{file_name}", self.directory()))
    }

    /// Size a picture of this kind is stored at.
    #[must_use]
    pub fn target_size(&self, dimensions: ImageDimensions) -> (u32, u32) {
        match self {
            Self::Avatar => (AVATAR_SIZE, AVATAR_SIZE),
            Self::Background => {
                let height = u64::from(BACKGROUND_WIDTH) * u64::from(dimensions.height)
                    / u64::from(dimensions.width.max(1));
                (BACKGROUND_WIDTH, (height as u32).max(1))
            }
        }
    }
}

impl FromStr for PictureKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avatar" => Ok(Self::Avatar),
            "background" => Ok(Self::Background),
            _ => Err(AppError::BadRequest(
                "The pic_type should be avatar or background".to_string(),
            )),
        }
    }
}

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageDimensions {
    /// Width equals height.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Wider than tall.
    #[must_use]
    pub const fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// A picture file referenced by a user's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPicture {
    /// Storage key as recorded on the profile.
    pub key: String,
    pub kind: PictureKind,
    /// User the file was stored for.
    pub owner_id: i32,
}

/// Validates, normalizes and stores profile pictures.
#[async_trait::async_trait]
pub trait ImageProcessor: Send + Sync {
    /// Check that `data` is a decodable picture and return its size.
    fn validate(&self, data: &[u8]) -> AppResult<ImageDimensions>;

    /// Whether `data` is a square picture.
    fn is_square(&self, data: &[u8]) -> AppResult<bool> {
        Ok(self.validate(data)?.is_square())
    }

    /// Whether `data` is a landscape picture.
    fn is_landscape(&self, data: &[u8]) -> AppResult<bool> {
        Ok(self.validate(data)?.is_landscape())
    }

    /// Resize and store a picture for `owner_id`, returning its storage key.
    async fn store(&self, data: Vec<u8>, kind: PictureKind, owner_id: i32) -> AppResult<String>;

    /// Remove a previously stored picture.
    ///
    /// Returns `false` without touching storage when the key does not name a
    /// file of `picture.owner_id`.
    async fn remove(&self, picture: &StoredPicture) -> AppResult<bool>;
}

/// [`ImageProcessor`] backed by the `image` crate and a [`StorageBackend`].
#[derive(Clone)]
pub struct ImageService {
    storage: Arc<dyn StorageBackend>,
}

impl ImageService {
    /// Create a new image service writing to `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }
}

fn invalid_picture() -> AppError {
    AppError::BadRequest("The file is not a valid picture".to_string())
}

fn read_dimensions(data: &[u8]) -> AppResult<ImageDimensions> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| invalid_picture())?
        .into_dimensions()
        .map_err(|_| invalid_picture())?;

    if width == 0 || height == 0 {
        return Err(invalid_picture());
    }

    Ok(ImageDimensions { width, height })
}

/// Decode, resize for `kind` and re-encode as JPEG.
fn normalize(data: &[u8], kind: PictureKind) -> AppResult<Vec<u8>> {
    let picture = image::load_from_memory(data).map_err(|_| invalid_picture())?;
    let dimensions = ImageDimensions {
        width: picture.width(),
        height: picture.height(),
    };
    let (width, height) = kind.target_size(dimensions);

    // JPEG has no alpha channel
    let resized = DynamicImage::ImageRgb8(
        picture
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgb8(),
    );

    let mut encoded = Vec::new();
    resized
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
        .map_err(|e| AppError::Internal(format!("Failed to encode picture: {e}")))?;

    Ok(encoded)
}

#[async_trait::async_trait]
impl ImageProcessor for ImageService {
    fn validate(&self, data: &[u8]) -> AppResult<ImageDimensions> {
        read_dimensions(data)
    }

    async fn store(&self, data: Vec<u8>, kind: PictureKind, owner_id: i32) -> AppResult<String> {
        let encoded = tokio::task::spawn_blocking(move || normalize(&data, kind))
            .await
            .map_err(|e| AppError::Internal(format!("Picture task failed: {e}")))??;

        let key = generate_storage_key(kind.directory(), owner_id);
        let uploaded = self.storage.upload(&key, &encoded).await?;

        tracing::debug!(key = %uploaded.key, size = uploaded.size, "Stored picture");
        Ok(uploaded.key)
    }

    async fn remove(&self, picture: &StoredPicture) -> AppResult<bool> {
        let Some(key) = picture.kind.owned_key(&picture.key, picture.owner_id) else {
            tracing::debug!(key = %picture.key, owner_id = picture.owner_id, "Skipping foreign picture");
            return Ok(false);
        };

        self.storage.delete(&key).await?;
        Ok(true)
    }
}
