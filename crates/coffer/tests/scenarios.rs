//! End-to-end scenarios across the full facade.
//!
//! These exercise whole collaboration flows rather than single calls,
//! on both storage backends.

use std::sync::Arc;

use coffer::store::{MemoryDirectory, MemoryStore, SqliteStore};
use coffer::{
    Caller, Coffer, CofferConfig, CofferError, Email, ItemBody, ItemDraft, Role, Store,
};
use coffer_testkit::TestFixture;

fn memory_coffer(fixture: &TestFixture) -> Coffer<MemoryStore, MemoryDirectory> {
    // Route facade logs through the test writer; only the first call wins.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Coffer::new(
        Arc::clone(&fixture.store),
        Arc::clone(&fixture.directory),
        CofferConfig::default(),
    )
}

fn caller_for(profile: &coffer::UserProfile) -> Caller {
    Caller::new(profile.id, profile.email.clone())
}

#[tokio::test]
async fn invite_redeem_collaborate_remove() {
    let fixture = TestFixture::new();
    let coffer = memory_coffer(&fixture);
    let owner = fixture.register_user("owner");
    let guest = fixture.register_user("guest");

    // Owner creates a chest and fills it.
    let chest = coffer
        .create_chest(&caller_for(&owner), "Recipes", Some("family recipes".into()))
        .await
        .unwrap();
    let item = coffer
        .add_item(
            &caller_for(&owner),
            &chest.id,
            ItemDraft::new(ItemBody::Note { text: "carbonara".into() }),
        )
        .await
        .unwrap();

    // Guest cannot see anything yet.
    assert!(coffer
        .get_chest(&caller_for(&guest), &chest.id)
        .await
        .is_err());

    // Invite, redeem, collaborate.
    let invite = coffer
        .invite(
            &caller_for(&owner),
            &chest.id,
            guest.email.clone(),
            Role::Editor,
        )
        .await
        .unwrap();
    coffer
        .accept_invite(&caller_for(&guest), &invite.token)
        .await
        .unwrap();

    let items = coffer
        .list_items(&caller_for(&guest), &chest.id)
        .await
        .unwrap();
    assert_eq!(items, vec![item]);

    let list = coffer
        .collaborators(&caller_for(&guest), &chest.id)
        .await
        .unwrap();
    assert_eq!(list.collaborators.len(), 1);
    assert_eq!(list.collaborators[0].role, Role::Editor);

    // Removal cuts access immediately.
    coffer
        .remove_collaborator(&caller_for(&owner), &chest.id, &guest.id)
        .await
        .unwrap();
    assert!(matches!(
        coffer.list_items(&caller_for(&guest), &chest.id).await,
        Err(CofferError::Denied(_))
    ));

    let chests = coffer.list_chests(&caller_for(&guest)).await.unwrap();
    assert!(chests.shared.is_empty());
}

#[tokio::test]
async fn cascade_delete_removes_everything() {
    let fixture = TestFixture::new();
    let coffer = memory_coffer(&fixture);
    let owner = fixture.register_user("owner");
    let editor = fixture.register_user("editor");

    let chest = coffer
        .create_chest(&caller_for(&owner), "Doomed", None)
        .await
        .unwrap();
    fixture
        .seed_permission(chest.id, editor.id, Role::Editor)
        .await;
    let item = coffer
        .add_item(
            &caller_for(&editor),
            &chest.id,
            ItemDraft::new(ItemBody::Todo { text: "pack".into(), done: false }),
        )
        .await
        .unwrap();
    let invite = coffer
        .invite(
            &caller_for(&owner),
            &chest.id,
            Email::new("late@example.com").unwrap(),
            Role::Viewer,
        )
        .await
        .unwrap();

    let cascade = coffer
        .delete_chest(&caller_for(&owner), &chest.id)
        .await
        .unwrap();
    assert_eq!(cascade.permissions, 1);
    assert_eq!(cascade.invites, 1);
    assert_eq!(cascade.items, 1);

    // Nothing scoped to the chest survives.
    assert!(fixture.store.get_item(&item.id).await.unwrap().is_none());
    assert!(fixture
        .store
        .get_invite_by_token(&invite.token)
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        coffer.get_chest(&caller_for(&owner), &chest.id).await,
        Err(CofferError::ChestNotFound(_))
    ));
}

#[tokio::test]
async fn owner_always_wins_role_resolution() {
    let fixture = TestFixture::new();
    let coffer = memory_coffer(&fixture);
    let owner = fixture.register_user("owner");

    let chest = coffer
        .create_chest(&caller_for(&owner), "Mine", None)
        .await
        .unwrap();
    // A stray viewer row for the owner, inserted behind the facade's back.
    fixture
        .seed_permission(chest.id, owner.id, Role::Viewer)
        .await;

    let view = coffer
        .get_chest(&caller_for(&owner), &chest.id)
        .await
        .unwrap();
    assert_eq!(view.role, Role::Owner);

    // And the owner can still do owner-only things.
    coffer
        .delete_chest(&caller_for(&owner), &chest.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn short_ttl_invite_expires() {
    let fixture = TestFixture::new();
    let coffer = Coffer::new(
        Arc::clone(&fixture.store),
        Arc::clone(&fixture.directory),
        CofferConfig { invite_ttl_ms: 0 },
    );
    let owner = fixture.register_user("owner");
    let guest = fixture.register_user("guest");
    let chest = fixture.seed_chest(owner.id, "flash sale").await;

    let invite = coffer
        .invite(
            &caller_for(&owner),
            &chest.id,
            guest.email.clone(),
            Role::Viewer,
        )
        .await
        .unwrap();

    // With a zero TTL the invite expires the millisecond after issuance.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    assert!(matches!(
        coffer.accept_invite(&caller_for(&guest), &invite.token).await,
        Err(CofferError::InviteExpired { .. })
    ));
    assert!(fixture
        .store
        .get_permission(&chest.id, &guest.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_redemptions_grant_exactly_once() {
    let fixture = TestFixture::new();
    let coffer = Arc::new(memory_coffer(&fixture));
    let owner = fixture.register_user("owner");
    let guest = fixture.register_user("guest");
    let chest = fixture.seed_chest(owner.id, "contested").await;

    let invite = coffer
        .invite(
            &caller_for(&owner),
            &chest.id,
            guest.email.clone(),
            Role::Editor,
        )
        .await
        .unwrap();

    // The same guest redeems from two sessions at once.
    let first = tokio::spawn({
        let coffer = Arc::clone(&coffer);
        let caller = caller_for(&guest);
        let token = invite.token.clone();
        async move { coffer.accept_invite(&caller, &token).await }
    });
    let second = tokio::spawn({
        let coffer = Arc::clone(&coffer);
        let caller = caller_for(&guest);
        let token = invite.token.clone();
        async move { coffer.accept_invite(&caller, &token).await }
    });
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    // Exactly one wins; the loser sees the invite gone or the grant
    // already in place, never a second permission row.
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|result| result.is_ok()).count(), 1);
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(matches!(
                err,
                CofferError::InviteNotFound | CofferError::AlreadyCollaborator(_)
            ));
        }
    }

    let permissions = fixture.store.list_permissions(&chest.id).await.unwrap();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0].user_id, guest.id);
    assert_eq!(permissions[0].role, Role::Editor);
    assert!(fixture
        .store
        .get_invite_by_token(&invite.token)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn sqlite_backend_agrees_on_the_invite_flow() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SqliteStore::open(dir.path().join("coffer.db")).unwrap());
    let directory = Arc::new(MemoryDirectory::new());
    let coffer = Coffer::new(Arc::clone(&store), directory, CofferConfig::default());

    let owner = Caller::new(
        coffer::UserId::random(),
        Email::new("owner@example.com").unwrap(),
    );
    let guest = Caller::new(
        coffer::UserId::random(),
        Email::new("guest@example.com").unwrap(),
    );

    let chest = coffer.create_chest(&owner, "Disk-backed", None).await.unwrap();
    let invite = coffer
        .invite(&owner, &chest.id, guest.email.clone(), Role::Admin)
        .await
        .unwrap();

    coffer.accept_invite(&guest, &invite.token).await.unwrap();
    assert!(matches!(
        coffer.accept_invite(&guest, &invite.token).await,
        Err(CofferError::InviteNotFound)
    ));

    // The admin may manage invites but not delete the chest.
    coffer
        .invite(
            &guest,
            &chest.id,
            Email::new("third@example.com").unwrap(),
            Role::Viewer,
        )
        .await
        .unwrap();
    assert!(matches!(
        coffer.delete_chest(&guest, &chest.id).await,
        Err(CofferError::Denied(_))
    ));

    let cascade = coffer.delete_chest(&owner, &chest.id).await.unwrap();
    assert_eq!(cascade.permissions, 1);
    assert_eq!(cascade.invites, 1);
    assert!(store.get_chest(&chest.id).await.unwrap().is_none());
}
