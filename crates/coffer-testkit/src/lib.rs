//! # Coffer Testkit
//!
//! Testing utilities for Coffer.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: Helper structs for setting up test scenarios
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use coffer_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let ada = fixture.register_user("ada");
//! assert_eq!(ada.email.as_str(), "ada@example.com");
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use coffer_testkit::generators::{invite_from_params, InviteParams};
//!
//! proptest! {
//!     #[test]
//!     fn invite_expiry_is_fixed(params: InviteParams) {
//!         let invite = invite_from_params(&params);
//!         prop_assert!(invite.expires_at >= invite.created_at);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_user_fixture, TestFixture};
pub use generators::{invite_from_params, InviteParams};
