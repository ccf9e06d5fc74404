//! Following service.

use std::collections::HashMap;

use cutaway_common::{AppError, AppResult};
use cutaway_db::{
    Session,
    entities::user,
    repositories::{FollowRepository, UserLookupKey, UserRepository},
};

/// Result of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new edge was created.
    Followed,
    /// The edge already existed; nothing changed.
    AlreadyFollowing,
}

/// Result of an unfollow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    /// The edge was removed.
    Unfollowed,
    /// There was no edge to remove.
    NotFollowing,
}

/// Following service for business logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowService;

impl FollowService {
    /// Create a new following service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Make `follower_id` follow `followed_id`.
    pub async fn follow(
        &self,
        session: &Session,
        follower_id: i32,
        followed_id: i32,
    ) -> AppResult<FollowOutcome> {
        if follower_id == followed_id {
            return Err(AppError::Conflict("You cannot follow yourself".to_string()));
        }

        UserRepository::new(session.conn())
            .find(&UserLookupKey::Id(followed_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {followed_id} not found")))?;

        let created = FollowRepository::new(session.conn())
            .create(follower_id, followed_id)
            .await?;
        if !created {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        tracing::info!(follower_id, followed_id, "User followed");
        Ok(FollowOutcome::Followed)
    }

    /// Remove the edge `follower_id -> followed_id` if there is one.
    pub async fn unfollow(
        &self,
        session: &Session,
        follower_id: i32,
        followed_id: i32,
    ) -> AppResult<UnfollowOutcome> {
        let removed = FollowRepository::new(session.conn())
            .delete_by_pair(follower_id, followed_id)
            .await?;

        if removed {
            tracing::info!(follower_id, followed_id, "User unfollowed");
            Ok(UnfollowOutcome::Unfollowed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    /// Follower counts of several users. Users nobody follows are absent.
    pub async fn follower_counts(
        &self,
        session: &Session,
        user_ids: &[i32],
    ) -> AppResult<HashMap<i32, u64>> {
        FollowRepository::new(session.conn())
            .count_followers_many(user_ids)
            .await
    }

    /// The `limit` most followed users with their follower counts.
    pub async fn top_followed(
        &self,
        session: &Session,
        limit: u64,
    ) -> AppResult<Vec<(user::Model, u64)>> {
        let ranking = FollowRepository::new(session.conn())
            .top_followed(limit)
            .await?;

        let ids: Vec<i32> = ranking.iter().map(|(id, _)| *id).collect();
        let mut users = UserRepository::new(session.conn())
            .find_by_ids(&ids)
            .await?;

        // Keep the ranking order, not the id order the lookup returns
        let mut ranked = Vec::with_capacity(ranking.len());
        for (id, followers) in ranking {
            if let Some(pos) = users.iter().position(|u| u.id == id) {
                ranked.push((users.swap_remove(pos), followers));
            }
        }

        Ok(ranked)
    }
}
