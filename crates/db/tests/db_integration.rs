//! Database integration tests.
//!
//! Run against a private in-memory `SQLite` database per test.

#![allow(clippy::unwrap_used)]

use cutaway_db::Session;
use cutaway_db::entities::User;
use cutaway_db::repositories::{FollowRepository, LinkRepository, UserRepository};
use cutaway_db::test_utils::{TestDatabase, new_user};
use sea_orm::{EntityTrait, PaginatorTrait};

#[tokio::test]
async fn test_committed_session_is_visible() {
    let db = TestDatabase::memory().await.unwrap();

    let session = Session::begin(db.connection()).await.unwrap();
    UserRepository::new(session.conn())
        .create(new_user("alice", "alice@x.com"))
        .await
        .unwrap();
    session.commit().await.unwrap();

    let found = UserRepository::new(db.connection())
        .find_by_username("alice")
        .await
        .unwrap();
    assert!(found.is_some());
}

#[tokio::test]
async fn test_rolled_back_session_leaves_no_trace() {
    let db = TestDatabase::memory().await.unwrap();

    let session = Session::begin(db.connection()).await.unwrap();
    UserRepository::new(session.conn())
        .create(new_user("alice", "alice@x.com"))
        .await
        .unwrap();
    session.rollback().await.unwrap();

    assert_eq!(User::find().count(db.connection()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_dropped_session_rolls_back() {
    let db = TestDatabase::memory().await.unwrap();

    {
        let session = Session::begin(db.connection()).await.unwrap();
        UserRepository::new(session.conn())
            .create(new_user("alice", "alice@x.com"))
            .await
            .unwrap();
    }

    assert_eq!(User::find().count(db.connection()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_deleting_user_removes_links_and_follows() {
    let db = TestDatabase::memory().await.unwrap();
    let conn = db.connection();
    let users = UserRepository::new(conn);
    let alice = users.create(new_user("alice", "alice@x.com")).await.unwrap();
    let bob = users.create(new_user("bob", "bob@x.com")).await.unwrap();
    let carol = users.create(new_user("carol", "carol@x.com")).await.unwrap();

    let follows = FollowRepository::new(conn);
    follows.create(alice.id, bob.id).await.unwrap();
    follows.create(bob.id, alice.id).await.unwrap();
    follows.create(carol.id, bob.id).await.unwrap();

    let links = LinkRepository::new(conn);
    links.upsert(alice.id, "telegram", "@alice", false).await.unwrap();

    assert!(users.delete(alice.id).await.unwrap());

    assert!(users.find_by_username("alice").await.unwrap().is_none());
    assert!(links.list_all(alice.id).await.unwrap().is_empty());
    assert_eq!(follows.count_followers(bob.id).await.unwrap(), 1);
    assert!(!follows.delete_by_pair(bob.id, alice.id).await.unwrap());
}
