//! Integration tests for token issuance
//!
//! These drive the issuer and the read/write request paths against the
//! in-memory store.

use content_tokens::auth::{
    AccessKey, Caller, PermissionMode, PermissionSlot, ResourceToken, ANONYMOUS_USER_ID,
};
use content_tokens::issuer::{IssueError, SelectionRule, TokenIssuer};
use content_tokens::server::{read_token, write_token, TokenResponse};
use content_tokens::storage::{
    InMemoryPermissionStore, Locator, NewPermission, PermissionStore, StorageError, UserLookup,
    DEFAULT_DATABASE_ID,
};
use std::sync::Arc;

const DB: &str = DEFAULT_DATABASE_ID;
const TEST_KEY: &str = "test-key-for-integration-tests";

async fn setup(collections: &[&str]) -> (Arc<InMemoryPermissionStore>, TokenIssuer) {
    setup_store(InMemoryPermissionStore::new(AccessKey::new(TEST_KEY)), collections).await
}

async fn setup_store(
    store: InMemoryPermissionStore,
    collections: &[&str],
) -> (Arc<InMemoryPermissionStore>, TokenIssuer) {
    let store = Arc::new(store);
    for collection in collections {
        store.create_collection(DB, collection).await.unwrap();
    }
    let issuer = TokenIssuer::new(store.clone());
    (store, issuer)
}

fn claims(token: &ResourceToken) -> content_tokens::auth::TokenClaims {
    ResourceToken::verify(token.as_str(), &AccessKey::new(TEST_KEY)).unwrap()
}

#[tokio::test]
async fn test_anonymous_scenario_on_fresh_store() {
    let (store, issuer) = setup(&["articles"]).await;

    let t1 = issuer
        .issue_token(
            ANONYMOUS_USER_ID,
            "articles",
            PermissionSlot::AnonymousRead,
            PermissionMode::Read,
        )
        .await
        .unwrap()
        .expect("token on first call");

    // User and permission were provisioned
    assert!(matches!(
        store.read_user(DB, ANONYMOUS_USER_ID).await.unwrap(),
        UserLookup::Found(_)
    ));
    let listed = store
        .list_permissions(&Locator::permissions_of(&Locator::user(DB, ANONYMOUS_USER_ID)))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, PermissionSlot::AnonymousRead);
    assert_eq!(listed[0].mode, PermissionMode::Read);
    assert_eq!(listed[0].resource_link, Locator::collection(DB, "articles"));
    assert_eq!(listed[0].token, t1);

    // Second identical call returns the same token
    let t2 = issuer
        .issue_token(
            ANONYMOUS_USER_ID,
            "articles",
            PermissionSlot::AnonymousRead,
            PermissionMode::Read,
        )
        .await
        .unwrap();
    assert_eq!(t2, Some(t1));
}

#[tokio::test]
async fn test_first_call_provisions_exactly_once() {
    let (store, issuer) = setup(&["articles"]).await;

    let token = issuer
        .issue_token("sid:alice", "articles", PermissionSlot::UserRead, PermissionMode::Read)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(store.user_count(), 1);
    assert_eq!(store.permission_count(), 1);

    let c = claims(&token);
    assert_eq!(c.user_id, "sid:alice");
    assert_eq!(c.permission_id, PermissionSlot::UserRead);
    assert_eq!(c.mode, PermissionMode::Read);
    assert_eq!(c.resource_link, "dbs/Content/colls/articles");
}

#[tokio::test]
async fn test_reissue_is_idempotent() {
    let (store, issuer) = setup(&["articles"]).await;

    let first = issuer
        .issue_token("sid:bob", "articles", PermissionSlot::UserWrite, PermissionMode::All)
        .await
        .unwrap();
    let second = issuer
        .issue_token("sid:bob", "articles", PermissionSlot::UserWrite, PermissionMode::All)
        .await
        .unwrap();

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(store.user_count(), 1);
    assert_eq!(store.permission_count(), 1);
}

#[tokio::test]
async fn test_unknown_collection() {
    let (store, issuer) = setup(&["articles"]).await;

    let result = issuer
        .issue_token("sid:carol", "missing", PermissionSlot::UserRead, PermissionMode::Read)
        .await;

    match result {
        Err(IssueError::CollectionNotFound(id)) => assert_eq!(id, "missing"),
        other => panic!("expected CollectionNotFound, got {:?}", other),
    }
    assert_eq!(store.user_count(), 0);
    assert_eq!(store.permission_count(), 0);
}

#[tokio::test]
async fn test_first_created_mode_sticks() {
    let (_store, issuer) = setup(&["articles"]).await;

    let write = issuer
        .issue_token("sid:dave", "articles", PermissionSlot::UserWrite, PermissionMode::All)
        .await
        .unwrap()
        .unwrap();

    // A later read request gets the existing read+write permission
    let read = issuer
        .issue_token("sid:dave", "articles", PermissionSlot::UserRead, PermissionMode::Read)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(read, write);
    assert_eq!(claims(&read).mode, PermissionMode::All);
}

/// Give one user a read permission and then a write permission, directly in the store
async fn seed_two_slots(store: &InMemoryPermissionStore) -> (ResourceToken, ResourceToken) {
    let coll = Locator::collection(DB, "articles");
    let user = store.create_user(DB, "sid:erin").await.unwrap();
    let self_link = user.self_link.unwrap();

    let read = store
        .create_permission(
            &self_link,
            NewPermission {
                id: PermissionSlot::UserRead,
                resource_link: coll.clone(),
                mode: PermissionMode::Read,
            },
        )
        .await
        .unwrap();
    let write = store
        .create_permission(
            &self_link,
            NewPermission {
                id: PermissionSlot::UserWrite,
                resource_link: coll,
                mode: PermissionMode::All,
            },
        )
        .await
        .unwrap();

    (read.token, write.token)
}

#[tokio::test]
async fn test_multi_slot_returns_first_created() {
    let (store, issuer) = setup(&["articles"]).await;
    let (read_token, write_token) = seed_two_slots(&store).await;

    for (slot, mode) in [
        (PermissionSlot::UserRead, PermissionMode::Read),
        (PermissionSlot::UserWrite, PermissionMode::All),
    ] {
        let token = issuer
            .issue_token("sid:erin", "articles", slot, mode)
            .await
            .unwrap();
        assert_eq!(token.as_ref(), Some(&read_token));
        assert_ne!(token.as_ref(), Some(&write_token));
    }
    assert_eq!(store.permission_count(), 2);
}

#[tokio::test]
async fn test_matching_slot_selection() {
    let (store, issuer) = setup(&["articles"]).await;
    let issuer = issuer.with_selection(SelectionRule::MatchingSlot);
    let (read_token, write_token) = seed_two_slots(&store).await;

    let write = issuer
        .issue_token("sid:erin", "articles", PermissionSlot::UserWrite, PermissionMode::All)
        .await
        .unwrap();
    assert_eq!(write, Some(write_token));

    let read = issuer
        .issue_token("sid:erin", "articles", PermissionSlot::UserRead, PermissionMode::Read)
        .await
        .unwrap();
    assert_eq!(read, Some(read_token));

    // No permission for the slot means no token, even though others exist
    let anon = issuer
        .issue_token("sid:erin", "articles", PermissionSlot::AnonymousRead, PermissionMode::Read)
        .await
        .unwrap();
    assert_eq!(anon, None);
}

#[tokio::test]
async fn test_degraded_creation_returns_no_token() {
    let store = InMemoryPermissionStore::new(AccessKey::new(TEST_KEY)).detached_users();
    let (store, issuer) = setup_store(store, &["articles"]).await;

    let token = issuer
        .issue_token("sid:frank", "articles", PermissionSlot::UserRead, PermissionMode::Read)
        .await
        .unwrap();
    assert_eq!(token, None);
    assert_eq!(store.user_count(), 1);
    assert_eq!(store.permission_count(), 0);

    // Later calls find the user and still have nothing to return
    let again = issuer
        .issue_token("sid:frank", "articles", PermissionSlot::UserRead, PermissionMode::Read)
        .await
        .unwrap();
    assert_eq!(again, None);
    assert_eq!(store.user_count(), 1);
}

#[tokio::test]
async fn test_store_unavailable_propagates() {
    let (store, issuer) = setup(&["articles"]).await;
    store.set_unavailable(true);

    let result = issuer
        .issue_token("sid:gina", "articles", PermissionSlot::UserRead, PermissionMode::Read)
        .await;
    assert!(matches!(
        result,
        Err(IssueError::Store(StorageError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn test_anonymous_read_ignores_collection_for_identity() {
    let (store, issuer) = setup(&["articles", "videos"]).await;

    for collection in ["articles", "videos"] {
        let response = read_token(&issuer, &Caller::Anonymous, collection).await;
        let TokenResponse::Issued(token) = response else {
            panic!("expected a token for {}", collection);
        };
        let c = claims(&token);
        assert_eq!(c.user_id, ANONYMOUS_USER_ID);
        assert_eq!(c.permission_id, PermissionSlot::AnonymousRead);
        assert_eq!(c.mode, PermissionMode::Read);
    }

    assert_eq!(store.user_count(), 1);
    assert_eq!(store.permission_count(), 1);
}

#[tokio::test]
async fn test_authenticated_read_and_write_paths() {
    let (_store, issuer) = setup(&["articles"]).await;
    let caller = Caller::Authenticated("sid:hank".to_string());

    let TokenResponse::Issued(token) = write_token(&issuer, &caller, "articles").await else {
        panic!("expected write token");
    };
    let c = claims(&token);
    assert_eq!(c.user_id, "sid:hank");
    assert_eq!(c.permission_id, PermissionSlot::UserWrite);
    assert_eq!(c.mode, PermissionMode::All);
}

#[tokio::test]
async fn test_anonymous_write_is_unauthorized() {
    let (store, issuer) = setup(&["articles"]).await;

    let response = write_token(&issuer, &Caller::Anonymous, "articles").await;
    assert_eq!(response, TokenResponse::Unauthorized);
    assert_eq!(store.user_count(), 0);
}

#[tokio::test]
async fn test_failures_are_indistinguishable() {
    let (_store, issuer) = setup(&["articles"]).await;
    let caller = Caller::Authenticated("sid:ivy".to_string());

    // Error
    let missing = read_token(&issuer, &caller, "missing").await;

    // No token
    let store = InMemoryPermissionStore::new(AccessKey::new(TEST_KEY)).detached_users();
    let (_store, degraded) = setup_store(store, &["articles"]).await;
    let empty = read_token(&degraded, &caller, "articles").await;

    assert_eq!(missing, TokenResponse::Failed);
    assert_eq!(empty, TokenResponse::Failed);
}
