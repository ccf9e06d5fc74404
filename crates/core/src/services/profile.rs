//! Profile service: registration, reads, edits and deletion of user profiles.

use std::{collections::BTreeMap, sync::Arc};

use chrono::Utc;
use cutaway_common::{AppError, AppResult};
use cutaway_db::{
    Session,
    entities::user,
    repositories::{
        FollowRepository, LinkRepository, UserLookupKey, UserRepository, DEFAULT_PAGE_LIMIT,
    },
};
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Deserializer};
use validator::{Validate, ValidateEmail};

use crate::services::media::{ImageProcessor, PictureKind, StoredPicture};

/// Maximum length of names, usernames and emails.
pub const MAX_NAME_LENGTH: usize = 50;

/// Maximum length of the about text.
pub const MAX_ABOUT_LENGTH: usize = 10_000;

/// Maximum length of a link name.
pub const MAX_LINK_NAME_LENGTH: usize = 30;

/// Maximum length of a link address.
pub const MAX_LINK_ADDRESS_LENGTH: usize = 100;

/// Deserialize a field so that `null` becomes `Some(None)`.
///
/// Pair with `#[serde(default)]` so an absent field stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Input for registering a new user.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    #[validate(email, length(max = 50))]
    pub email: String,

    #[validate(length(min = 1, max = 50))]
    pub first_name: String,

    #[validate(length(min = 1, max = 50))]
    pub last_name: String,

    #[validate(length(min = 1, max = 50))]
    pub username: String,

    #[validate(length(max = 50))]
    pub google_id: Option<String>,
}

/// Partial update of a profile.
///
/// Required fields are only applied when present and non-empty. Clearable
/// fields are applied whenever present: `null` clears them, `""` stores an
/// empty string. Link maps are merged into the existing links.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub google_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub about: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub user_pic: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub bg_pic: Option<Option<String>>,

    pub links: Option<BTreeMap<String, String>>,
    pub additional_links: Option<BTreeMap<String, String>>,
}

/// A user together with its derived profile data.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: user::Model,
    pub links: BTreeMap<String, String>,
    pub additional_links: BTreeMap<String, String>,
    pub followers_number: u64,
}

/// A picture attached by [`ProfileService::upload_picture`].
#[derive(Debug, Clone)]
pub struct PictureUpload {
    /// The newly stored file, now referenced by the profile.
    pub stored: StoredPicture,
    /// The file it replaced, if any.
    pub replaced: Option<StoredPicture>,
}

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    images: Arc<dyn ImageProcessor>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn check_length(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

fn check_links(links: &BTreeMap<String, String>) -> AppResult<()> {
    for (name, address) in links {
        if name.is_empty() {
            return Err(AppError::BadRequest("Link name must not be empty".to_string()));
        }
        check_length("Link name", name, MAX_LINK_NAME_LENGTH)?;
        check_length("Link address", address, MAX_LINK_ADDRESS_LENGTH)?;
    }
    Ok(())
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub fn new(images: Arc<dyn ImageProcessor>) -> Self {
        Self { images }
    }

    /// Register a new user.
    ///
    /// Username clashes are reported before email clashes.
    pub async fn register(&self, session: &Session, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        let users = UserRepository::new(session.conn());

        if users.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "User @{} already exists",
                input.username
            )));
        }

        if users
            .find(&UserLookupKey::Email(input.email.clone()))
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "The user with such email already exists".to_string(),
            ));
        }

        let google_id = non_empty(input.google_id);
        if let Some(ref google_id) = google_id
            && users
                .find(&UserLookupKey::GoogleId(google_id.clone()))
                .await?
                .is_some()
        {
            return Err(AppError::Conflict(
                "The user with such google id already exists".to_string(),
            ));
        }

        let model = user::ActiveModel {
            email: Set(input.email),
            username: Set(input.username),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            google_id: Set(google_id),
            is_active: Set(true),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        };

        let user = users.create(model).await?;
        tracing::info!(user_id = user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, session: &Session, username: &str) -> AppResult<user::Model> {
        UserRepository::new(session.conn())
            .get_by_username(username)
            .await
    }

    /// Full profile of `username`.
    pub async fn get_profile(&self, session: &Session, username: &str) -> AppResult<ProfileView> {
        let user = self.get_by_username(session, username).await?;
        self.profile_of(session, user).await
    }

    /// Attach links and follower count to a user.
    pub async fn profile_of(&self, session: &Session, user: user::Model) -> AppResult<ProfileView> {
        let mut links = BTreeMap::new();
        let mut additional_links = BTreeMap::new();

        for link in LinkRepository::new(session.conn()).list_all(user.id).await? {
            if link.additional {
                additional_links.insert(link.name, link.link);
            } else {
                links.insert(link.name, link.link);
            }
        }

        let followers_number = FollowRepository::new(session.conn())
            .count_followers(user.id)
            .await?;

        Ok(ProfileView {
            user,
            links,
            additional_links,
            followers_number,
        })
    }

    /// Page through all users in registration order.
    pub async fn list(
        &self,
        session: &Session,
        skip: u64,
        limit: Option<u64>,
    ) -> AppResult<Vec<user::Model>> {
        UserRepository::new(session.conn())
            .list(skip, limit.unwrap_or(DEFAULT_PAGE_LIMIT))
            .await
    }

    /// Users whose username contains `pattern`.
    pub async fn search(&self, session: &Session, pattern: &str) -> AppResult<Vec<user::Model>> {
        UserRepository::new(session.conn()).search(pattern).await
    }

    /// Apply a partial update to the profile of `username`.
    pub async fn edit_profile(
        &self,
        session: &Session,
        username: &str,
        patch: ProfilePatch,
    ) -> AppResult<user::Model> {
        let users = UserRepository::new(session.conn());
        let current = users.get_by_username(username).await?;
        let user_id = current.id;

        let email = non_empty(patch.email);
        let first_name = non_empty(patch.first_name);
        let last_name = non_empty(patch.last_name);
        let new_username = non_empty(patch.username);

        if let Some(ref email) = email {
            if !email.validate_email() {
                return Err(AppError::BadRequest("Invalid email address".to_string()));
            }
            check_length("Email", email, MAX_NAME_LENGTH)?;
            if let Some(other) = users.find(&UserLookupKey::Email(email.clone())).await?
                && other.id != user_id
            {
                return Err(AppError::Conflict(
                    "The user with such email already exists".to_string(),
                ));
            }
        }
        if let Some(ref name) = first_name {
            check_length("First name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(ref name) = last_name {
            check_length("Last name", name, MAX_NAME_LENGTH)?;
        }
        if let Some(ref name) = new_username {
            check_length("Username", name, MAX_NAME_LENGTH)?;
            if let Some(other) = users.find_by_username(name).await?
                && other.id != user_id
            {
                return Err(AppError::Conflict(format!("User @{name} already exists")));
            }
        }

        // An empty google id would collide with every other empty one
        let google_id = patch.google_id.map(non_empty);
        if let Some(Some(ref google_id)) = google_id
            && let Some(other) = users
                .find(&UserLookupKey::GoogleId(google_id.clone()))
                .await?
            && other.id != user_id
        {
            return Err(AppError::Conflict(
                "The user with such google id already exists".to_string(),
            ));
        }

        if let Some(Some(ref about)) = patch.about {
            check_length("About", about, MAX_ABOUT_LENGTH)?;
        }
        if let Some(ref links) = patch.links {
            check_links(links)?;
        }
        if let Some(ref links) = patch.additional_links {
            check_links(links)?;
        }

        let mut model = current.into_active_model();
        if let Some(email) = email {
            model.email = Set(email);
        }
        if let Some(first_name) = first_name {
            model.first_name = Set(first_name);
        }
        if let Some(last_name) = last_name {
            model.last_name = Set(last_name);
        }
        if let Some(username) = new_username {
            model.username = Set(username);
        }
        if let Some(google_id) = google_id {
            model.google_id = Set(google_id);
        }
        if let Some(about) = patch.about {
            model.about = Set(about);
        }
        if let Some(phone) = patch.phone {
            model.phone = Set(phone);
        }
        if let Some(user_pic) = patch.user_pic {
            model.user_pic = Set(user_pic);
        }
        if let Some(bg_pic) = patch.bg_pic {
            model.bg_pic = Set(bg_pic);
        }
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = users.update(model).await?;

        let links = LinkRepository::new(session.conn());
        for (name, address) in patch.links.unwrap_or_default() {
            links.upsert(user_id, &name, &address, false).await?;
        }
        for (name, address) in patch.additional_links.unwrap_or_default() {
            links.upsert(user_id, &name, &address, true).await?;
        }

        tracing::info!(user_id, username = %updated.username, "Profile edited");
        Ok(updated)
    }

    /// Delete the link named `name` of `owner`.
    pub async fn delete_link(&self, session: &Session, owner: &user::Model, name: &str) -> AppResult<()> {
        let removed = LinkRepository::new(session.conn())
            .delete(owner.id, name)
            .await?;

        if !removed {
            return Err(AppError::NotFound(format!(
                "Link not found for user @{}",
                owner.username
            )));
        }

        tracing::info!(user_id = owner.id, link = %name, "Link deleted");
        Ok(())
    }

    /// Point the `kind` picture of `user_id` at `stored_key`.
    ///
    /// Returns the key it replaced, if any.
    pub async fn attach_picture(
        &self,
        session: &Session,
        user_id: i32,
        kind: PictureKind,
        stored_key: &str,
    ) -> AppResult<Option<String>> {
        let users = UserRepository::new(session.conn());
        let current = users
            .find(&UserLookupKey::Id(user_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        let previous = match kind {
            PictureKind::Avatar => current.user_pic.clone(),
            PictureKind::Background => current.bg_pic.clone(),
        };

        let mut model = current.into_active_model();
        match kind {
            PictureKind::Avatar => model.user_pic = Set(Some(stored_key.to_string())),
            PictureKind::Background => model.bg_pic = Set(Some(stored_key.to_string())),
        }
        model.updated_at = Set(Some(Utc::now().into()));
        users.update(model).await?;

        Ok(previous)
    }

    /// Validate, store and attach a new picture.
    ///
    /// The replaced picture stays on disk: the caller drops it with
    /// [`Self::remove_pictures`] once the session is committed, or drops the
    /// new one instead if the commit fails.
    pub async fn upload_picture(
        &self,
        session: &Session,
        user: &user::Model,
        kind: PictureKind,
        data: Vec<u8>,
    ) -> AppResult<PictureUpload> {
        let dimensions = self.images.validate(&data)?;
        kind.check_shape(dimensions)?;

        let stored = StoredPicture {
            key: self.images.store(data, kind, user.id).await?,
            kind,
            owner_id: user.id,
        };

        let previous = match self.attach_picture(session, user.id, kind, &stored.key).await {
            Ok(previous) => previous,
            Err(e) => {
                self.remove_pictures([stored]).await;
                return Err(e);
            }
        };

        tracing::info!(user_id = user.id, kind = kind.as_str(), key = %stored.key, "Picture changed");

        let replaced = previous
            .filter(|key| *key != stored.key)
            .map(|key| StoredPicture {
                key,
                kind,
                owner_id: user.id,
            });
        Ok(PictureUpload { stored, replaced })
    }

    /// Delete `username` with its links and follow edges.
    ///
    /// Returns the pictures the user referenced; the caller removes them
    /// with [`Self::remove_pictures`] after committing.
    pub async fn delete_user(
        &self,
        session: &Session,
        username: &str,
    ) -> AppResult<Vec<StoredPicture>> {
        let users = UserRepository::new(session.conn());
        let user = users.get_by_username(username).await?;

        if !users.delete(user.id).await? {
            return Err(AppError::UserNotFound(username.to_string()));
        }

        let pictures = [
            (user.user_pic, PictureKind::Avatar),
            (user.bg_pic, PictureKind::Background),
        ]
        .into_iter()
        .filter_map(|(key, kind)| {
            key.map(|key| StoredPicture {
                key,
                kind,
                owner_id: user.id,
            })
        })
        .collect();

        tracing::info!(user_id = user.id, username = %username, "User deleted");
        Ok(pictures)
    }

    /// Remove picture files, logging failures instead of returning them.
    ///
    /// Keys that do not belong to the picture's owner are left alone.
    pub async fn remove_pictures(&self, pictures: impl IntoIterator<Item = StoredPicture>) {
        for picture in pictures {
            if let Err(e) = self.images.remove(&picture).await {
                tracing::warn!(error = %e, key = %picture.key, "Failed to remove picture");
            }
        }
    }
}
