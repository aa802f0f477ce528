//! Proptest generators for property-based testing.

use proptest::prelude::*;

use coffer_core::{ChestId, Email, ItemBody, UserId};
use coffer_perms::{Invite, Role};

/// Generate a random UserId.
pub fn user_id() -> impl Strategy<Value = UserId> {
    any::<[u8; 16]>().prop_map(UserId::from_bytes)
}

/// Generate a random ChestId.
pub fn chest_id() -> impl Strategy<Value = ChestId> {
    any::<[u8; 16]>().prop_map(ChestId::from_bytes)
}

/// Generate a syntactically valid email address.
pub fn email() -> impl Strategy<Value = Email> {
    "[a-z][a-z0-9.]{0,15}@[a-z][a-z0-9-]{0,15}\\.[a-z]{2,4}".prop_map(|s| {
        Email::new(&s).unwrap_or_else(|e| panic!("generator made a bad email {:?}: {}", s, e))
    })
}

/// Generate any role, including Owner.
pub fn role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Viewer),
        Just(Role::Editor),
        Just(Role::Admin),
        Just(Role::Owner),
    ]
}

/// Generate a role an invite may carry (everything below Owner).
pub fn grantable_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Viewer), Just(Role::Editor), Just(Role::Admin)]
}

/// Generate a chest name.
pub fn chest_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ]{0,31}".prop_map(String::from)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate an invite TTL in milliseconds.
pub fn ttl() -> impl Strategy<Value = i64> {
    1i64..=365 * 24 * 60 * 60 * 1000
}

/// Generate an item body.
pub fn item_body() -> impl Strategy<Value = ItemBody> {
    prop_oneof![
        "[ -~]{0,200}".prop_map(|text| ItemBody::Note { text }),
        ("https?://[a-z]{1,10}\\.[a-z]{2,4}/[a-z0-9/]{0,20}", proptest::option::of("[ -~]{1,40}"))
            .prop_map(|(url, title)| ItemBody::Link { url, title }),
        ("[ -~]{1,80}", any::<bool>()).prop_map(|(text, done)| ItemBody::Todo { text, done }),
    ]
}

/// Generate a tag list.
pub fn tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9-]{0,15}".prop_map(String::from), 0..=5)
}

/// Parameters for generating an invite.
#[derive(Debug, Clone)]
pub struct InviteParams {
    pub chest_id: ChestId,
    pub email: Email,
    pub role: Role,
    pub invited_by: UserId,
    pub now: i64,
    pub ttl_ms: i64,
}

impl Arbitrary for InviteParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (chest_id(), email(), grantable_role(), user_id(), timestamp(), ttl())
            .prop_map(|(chest_id, email, role, invited_by, now, ttl_ms)| InviteParams {
                chest_id,
                email,
                role,
                invited_by,
                now,
                ttl_ms,
            })
            .boxed()
    }
}

/// Generate an invite from parameters.
pub fn invite_from_params(params: &InviteParams) -> Invite {
    Invite::new(
        params.chest_id,
        params.email.clone(),
        params.role,
        params.invited_by,
        params.now,
        params.ttl_ms,
    )
}
