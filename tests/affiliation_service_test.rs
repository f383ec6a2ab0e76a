// ABOUTME: Integration tests for the affiliation workflow at the service layer
// ABOUTME: Covers invites, verification stages, accept/decline/remove, referral joins and store failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gymn
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{next_event, next_invite_token, TestContext, TEST_PASSWORD};
use gymn_server::config::{DatabaseConfig, DatabaseUrl};
use gymn_server::database::repositories::{
    AffiliationStore, AffiliationStoreImpl, Directory, DirectoryImpl, GymRegistry,
    GymRegistryImpl,
};
use gymn_server::database::Database;
use gymn_server::errors::{AppError, DatabaseError, ErrorCategory, ErrorCode};
use gymn_server::models::{
    Account, Affiliation, AffiliationState, Gym, InviteSelector, InviteType, ReferralCode,
};
use gymn_server::notifications::AffiliationEvent;
use gymn_server::services::{RegistrationForm, VerifyInviteRequest, VerifyStage};
use uuid::Uuid;

fn by_email(email: &str) -> InviteSelector {
    InviteSelector::from_parts(Some(email), None).unwrap()
}

fn by_username(username: &str) -> InviteSelector {
    InviteSelector::from_parts(None, Some(username)).unwrap()
}

fn verify_request(token: &str, email: &str, username: &str) -> VerifyInviteRequest {
    VerifyInviteRequest {
        access_token: token.to_owned(),
        email: email.to_owned(),
        username: username.to_owned(),
        password: TEST_PASSWORD.to_owned(),
    }
}

fn member_form(email: &str, username: &str, password: &str) -> RegistrationForm {
    RegistrationForm::Member {
        email: email.to_owned(),
        username: username.to_owned(),
        display_name: "Member".to_owned(),
        password: password.to_owned(),
    }
}

fn broken_rules(error: &AppError) -> Vec<String> {
    error.context.details["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["rule"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Existing-account invites
// ============================================================================

#[tokio::test]
async fn test_owner_invites_member_who_accepts() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "member1").await;
    let gym = owner.gym.clone().unwrap();
    let mut events = ctx.notifications.subscribe();

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("M@X.com"))
        .await
        .unwrap();
    assert_eq!(invite.user_id, member.account.id);
    assert_eq!(invite.belongs_to, gym.id);
    assert_eq!(invite.invite_type, InviteType::Existing);
    assert_eq!(invite.state(), AffiliationState::Pending);

    let notified = next_event(&mut events, |event| match event {
        AffiliationEvent::GymInvite {
            affiliation_id,
            gym_name,
            ..
        } => Some((affiliation_id, gym_name)),
        _ => None,
    })
    .await;
    assert_eq!(notified, (invite.id, gym.name.clone()));

    let inbox = ctx
        .affiliations
        .list_invitations(member.account.id)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].affiliation_id, invite.id);
    assert_eq!(inbox[0].gym.id, gym.id);

    let accepted = ctx
        .affiliations
        .accept(invite.id, member.account.id)
        .await
        .unwrap();
    assert!(accepted.verified);
    assert!(ctx
        .affiliations
        .list_invitations(member.account.id)
        .await
        .unwrap()
        .is_empty());

    let roster = ctx
        .affiliations
        .list_gym_affiliates(owner.account.id)
        .await
        .unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].state, AffiliationState::Active);
    assert_eq!(roster[0].user.id, member.account.id);

    let current = ctx.affiliations.current_gym(member.account.id).await.unwrap();
    assert_eq!(current.id, gym.id);

    // Accepting twice is a state conflict
    let again = ctx
        .affiliations
        .accept(invite.id, member.account.id)
        .await
        .unwrap_err();
    assert_eq!(again.code, ErrorCode::InvalidState);
}

#[tokio::test]
async fn test_invite_by_username_ignores_case() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "risixdzn").await;

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_username("RisixDzn"))
        .await
        .unwrap();
    assert_eq!(invite.user_id, member.account.id);
}

#[tokio::test]
async fn test_second_invite_for_affiliated_member_conflicts() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let rival = ctx.owner("r@x.com", "rivalowner").await;
    ctx.member("m@x.com", "member1").await;

    ctx.affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();

    for requester in [owner.account.id, rival.account.id] {
        let err = ctx
            .affiliations
            .invite_existing(requester, &by_username("member1"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Conflict);
        assert_eq!(err.http_status(), 409);
    }
}

#[tokio::test]
async fn test_member_cannot_invite() {
    let ctx = TestContext::new().await;
    let member = ctx.member("m@x.com", "member1").await;
    ctx.member("o@x.com", "other1").await;

    let err = ctx
        .affiliations
        .invite_existing(member.account.id, &by_email("o@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unauthorized);

    let err = ctx
        .affiliations
        .invite_new(member.account.id, "New Person", "n@x.com")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unauthorized);

    let err = ctx
        .affiliations
        .list_gym_affiliates(member.account.id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Unauthorized);
}

#[tokio::test]
async fn test_owner_cannot_affiliate_self_or_other_owners() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    ctx.owner("r@x.com", "rivalowner").await;

    for selector in [by_email("g@x.com"), by_username("rivalowner")] {
        let err = ctx
            .affiliations
            .invite_existing(owner.account.id, &selector)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Forbidden);
        assert_eq!(err.http_status(), 403);
    }
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;

    let err = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("nobody@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
    assert_eq!(err.display_title(), "User does not exist.");
}

#[test]
fn test_selector_requires_exactly_one_field() {
    let both = InviteSelector::from_parts(Some("m@x.com"), Some("member1")).unwrap_err();
    assert_eq!(both.category(), ErrorCategory::ValidationError);

    let neither = InviteSelector::from_parts(None, Some("   ")).unwrap_err();
    assert_eq!(neither.category(), ErrorCategory::ValidationError);
}

#[tokio::test]
async fn test_deleted_session_account_is_unauthorized() {
    let ctx = TestContext::new().await;

    let err = ctx
        .affiliations
        .invite_existing(Uuid::new_v4(), &by_email("m@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);
}

// ============================================================================
// Decline and removal
// ============================================================================

#[tokio::test]
async fn test_decline_removes_invitation() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "member1").await;

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
    ctx.affiliations
        .decline(invite.id, member.account.id)
        .await
        .unwrap();

    assert!(ctx.store.find_by_id(invite.id).await.unwrap().is_none());

    // Free to be invited again
    ctx.affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_decline_of_removed_invitation_is_not_found() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "member1").await;

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
    assert!(ctx
        .affiliations
        .remove(invite.id, owner.account.id)
        .await
        .unwrap());

    let err = ctx
        .affiliations
        .decline(invite.id, member.account.id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_only_addressee_can_answer_invitation() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    ctx.member("m@x.com", "member1").await;
    let bystander = ctx.member("b@x.com", "bystander").await;

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();

    let err = ctx
        .affiliations
        .accept(invite.id, bystander.account.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);

    let err = ctx
        .affiliations
        .decline(invite.id, owner.account.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);
}

#[tokio::test]
async fn test_only_gym_owner_can_remove() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let rival = ctx.owner("r@x.com", "rivalowner").await;
    let member = ctx.member("m@x.com", "member1").await;
    let mut events = ctx.notifications.subscribe();

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
    ctx.affiliations
        .accept(invite.id, member.account.id)
        .await
        .unwrap();

    for requester in [rival.account.id, member.account.id] {
        let err = ctx
            .affiliations
            .remove(invite.id, requester)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthInvalid);
    }

    assert!(ctx
        .affiliations
        .remove(invite.id, owner.account.id)
        .await
        .unwrap());
    let removed = next_event(&mut events, |event| match event {
        AffiliationEvent::AffiliateRemoved { affiliation_id, .. } => Some(affiliation_id),
        _ => None,
    })
    .await;
    assert_eq!(removed, invite.id);

    let err = ctx
        .affiliations
        .remove(invite.id, owner.account.id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    // The member can be invited again once removed
    let reinvite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
    assert_ne!(reinvite.id, invite.id);
    assert_eq!(reinvite.invite_type, InviteType::Existing);
    assert!(reinvite.is_pending());
    let rows = ctx.store.find_by_user(member.account.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, reinvite.id);
}

// ============================================================================
// New-account invites and verification
// ============================================================================

#[tokio::test]
async fn test_new_account_invite_and_verification() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    let invite = ctx
        .affiliations
        .invite_new(owner.account.id, "New Person", "N@X.com")
        .await
        .unwrap();
    assert_eq!(invite.account.email, "n@x.com");
    assert!(!invite.account.verified);
    assert!(invite.account.username.is_none());
    assert_eq!(invite.affiliation.invite_type, InviteType::New);
    assert!(invite.affiliation.is_pending());

    let token = next_invite_token(&mut events).await;

    // Placeholder accounts cannot sign in yet
    let err = ctx
        .registration
        .login("n@x.com", TEST_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);

    let session = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "risixdzn"))
        .await
        .unwrap();
    assert_eq!(session.user_id, invite.account.id);
    assert!(ctx.auth.validate_session(&session.token).is_ok());

    let account = ctx
        .directory
        .find_by_id(invite.account.id)
        .await
        .unwrap()
        .unwrap();
    assert!(account.verified);
    assert_eq!(account.username.as_deref(), Some("risixdzn"));

    let row = ctx
        .store
        .find_by_id(invite.affiliation.id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.verified);

    ctx.registration
        .login("n@x.com", TEST_PASSWORD)
        .await
        .unwrap();

    // A used link cannot complete the account again
    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "risixdzn"))
        .await
        .unwrap_err();
    assert_eq!(err.stage, VerifyStage::Validation);
    assert_eq!(err.stage.code(), 3);
}

#[tokio::test]
async fn test_invite_new_rejects_registered_email() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    ctx.member("m@x.com", "member1").await;

    let err = ctx
        .affiliations
        .invite_new(owner.account.id, "Member", "m@x.com")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);
}

#[tokio::test]
async fn test_removed_new_account_invite_frees_email() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    let first = ctx
        .affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    let stale_token = next_invite_token(&mut events).await;

    // Placeholders are not addressable as existing accounts
    let err = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("n@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);

    assert!(ctx
        .affiliations
        .remove(first.affiliation.id, owner.account.id)
        .await
        .unwrap());
    assert!(ctx.directory.find_by_email("n@x.com").await.unwrap().is_none());

    let second = ctx
        .affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    assert_ne!(second.account.id, first.account.id);
    let token = next_invite_token(&mut events).await;

    // The first link belonged to the discarded placeholder
    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&stale_token, "n@x.com", "newperson"))
        .await
        .unwrap_err();
    assert_eq!(err.stage, VerifyStage::Validation);

    ctx.affiliations
        .remove(second.affiliation.id, owner.account.id)
        .await
        .unwrap();
    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "newperson"))
        .await
        .unwrap_err();
    assert_eq!(err.stage, VerifyStage::Validation);

    let registered = ctx
        .registration
        .register(member_form("n@x.com", "newperson", TEST_PASSWORD))
        .await
        .unwrap();
    assert!(registered.account.verified);
}

#[tokio::test]
async fn test_verify_without_pending_invite_fails_at_profile_stage() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    let invite = ctx
        .affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    let token = next_invite_token(&mut events).await;

    // Row vanishes behind the service's back
    assert!(ctx.store.delete(invite.affiliation.id).await.unwrap());

    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "newperson"))
        .await
        .unwrap_err();
    assert_eq!(err.stage, VerifyStage::ProfileUpdate);
    assert_eq!(err.error.category(), ErrorCategory::NotFound);

    let account = ctx
        .directory
        .find_by_id(invite.account.id)
        .await
        .unwrap()
        .unwrap();
    assert!(!account.verified);
    assert!(account.username.is_none());
}

#[tokio::test]
async fn test_verify_rejects_token_for_other_email() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    ctx.affiliations
        .invite_new(owner.account.id, "First Person", "a@x.com")
        .await
        .unwrap();
    let token = next_invite_token(&mut events).await;
    ctx.affiliations
        .invite_new(owner.account.id, "Second Person", "b@x.com")
        .await
        .unwrap();

    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "b@x.com", "secondp"))
        .await
        .unwrap_err();
    assert_eq!(err.stage.code(), 3);
    assert_eq!(err.error.category(), ErrorCategory::Unauthorized);
}

#[tokio::test]
async fn test_verify_rejects_session_token() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;

    let invite = ctx
        .affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    let placeholder = ctx
        .directory
        .find_by_id(invite.account.id)
        .await
        .unwrap()
        .unwrap();
    let session = ctx.auth.create_session(&placeholder).unwrap();

    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&session.token, "n@x.com", "newperson"))
        .await
        .unwrap_err();
    assert_eq!(err.stage, VerifyStage::Validation);
}

#[tokio::test]
async fn test_verify_reports_every_broken_field() {
    let ctx = TestContext::new().await;

    let request = VerifyInviteRequest {
        access_token: String::new(),
        email: "not-an-email".to_owned(),
        username: "ab".to_owned(),
        password: "short".to_owned(),
    };
    let err = ctx
        .affiliations
        .verify_new_account(&request)
        .await
        .unwrap_err();
    assert_eq!(err.stage.code(), 3);
    assert_eq!(err.error.category(), ErrorCategory::ValidationError);

    let fields: Vec<String> = err.error.context.details["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap().to_owned())
        .collect();
    for expected in ["access_token", "email", "username", "password"] {
        assert!(fields.iter().any(|f| f == expected), "missing {expected}");
    }
}

#[tokio::test]
async fn test_verify_rejects_taken_username() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    ctx.affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    let token = next_invite_token(&mut events).await;

    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "GymOwner"))
        .await
        .unwrap_err();
    assert_eq!(err.stage.code(), 3);
    assert_eq!(err.error.category(), ErrorCategory::Conflict);
}

// ============================================================================
// Referral joins
// ============================================================================

#[tokio::test]
async fn test_join_by_referral_code() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "member1").await;
    let code = owner.gym.as_ref().unwrap().referral_code.to_string();

    let joined = ctx
        .affiliations
        .join_by_referral(member.account.id, &code.to_lowercase())
        .await
        .unwrap();
    assert_eq!(joined.invite_type, InviteType::Referral);
    assert!(joined.verified);

    let err = ctx
        .affiliations
        .join_by_referral(member.account.id, &code)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);
}

#[tokio::test]
async fn test_referral_join_accepts_pending_invite_from_same_gym() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "member1").await;
    let code = owner.gym.as_ref().unwrap().referral_code.to_string();

    let invite = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
    let joined = ctx
        .affiliations
        .join_by_referral(member.account.id, &code)
        .await
        .unwrap();
    assert_eq!(joined.id, invite.id);
    assert!(joined.verified);
    assert_eq!(joined.invite_type, InviteType::Existing);
}

#[tokio::test]
async fn test_referral_join_guards() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let rival = ctx.owner("r@x.com", "rivalowner").await;
    let member = ctx.member("m@x.com", "member1").await;
    let code = owner.gym.as_ref().unwrap().referral_code.to_string();

    let err = ctx
        .affiliations
        .join_by_referral(rival.account.id, &code)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Forbidden);

    let err = ctx
        .affiliations
        .join_by_referral(member.account.id, "bad")
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ValidationError);

    let unused = if code == "ZZZZZZZ" { "YYYYYYY" } else { "ZZZZZZZ" };
    let err = ctx
        .affiliations
        .join_by_referral(member.account.id, unused)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[tokio::test]
async fn test_current_gym_requires_active_affiliation() {
    let ctx = TestContext::new().await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let member = ctx.member("m@x.com", "member1").await;

    let own = ctx.affiliations.current_gym(owner.account.id).await.unwrap();
    assert_eq!(own.id, owner.gym.as_ref().unwrap().id);

    ctx.affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap();
    let err = ctx
        .affiliations
        .current_gym(member.account.id)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

// ============================================================================
// Registration rules
// ============================================================================

#[tokio::test]
async fn test_registration_rejects_duplicate_email_and_username() {
    let ctx = TestContext::new().await;
    ctx.member("m@x.com", "member1").await;

    let err = ctx
        .registration
        .register(member_form("M@x.com", "member2", TEST_PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);

    let err = ctx
        .registration
        .register(member_form("other@x.com", "MEMBER1", TEST_PASSWORD))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Conflict);
}

#[tokio::test]
async fn test_password_policy() {
    let ctx = TestContext::new().await;

    let cases = [
        ("alllowercase1", Some("missing_uppercase")),
        ("ALLUPPERCASE1", Some("missing_lowercase")),
        ("NoDigitsHere", Some("missing_digit")),
        ("Valid123", None),
    ];
    for (i, (password, rule)) in cases.into_iter().enumerate() {
        let result = ctx
            .registration
            .register(member_form(&format!("p{i}@x.com"), &format!("user{i}"), password))
            .await;
        match rule {
            Some(rule) => {
                let err = result.unwrap_err();
                assert_eq!(err.category(), ErrorCategory::ValidationError);
                assert_eq!(broken_rules(&err), vec![rule.to_owned()], "{password}");
            }
            None => {
                result.unwrap();
            }
        }
    }
}

#[tokio::test]
async fn test_username_rule() {
    let ctx = TestContext::new().await;

    let too_long = "a".repeat(31);
    for (i, username) in ["ab", too_long.as_str(), "bad-name!"].into_iter().enumerate() {
        let err = ctx
            .registration
            .register(member_form(&format!("u{i}@x.com"), username, TEST_PASSWORD))
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::ValidationError, "{username}");
    }

    ctx.registration
        .register(member_form("ok@x.com", "risixdzn", TEST_PASSWORD))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_login_and_profile_update() {
    let ctx = TestContext::new().await;
    let member = ctx.member("m@x.com", "member1").await;

    let err = ctx
        .registration
        .login("m@x.com", "Wrong123")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::AuthInvalid);

    let session = ctx.registration.login(" M@X.com ", TEST_PASSWORD).await.unwrap();
    assert_eq!(session.user_id, member.account.id);

    let update = gymn_server::services::ProfileUpdate {
        display_name: "Renamed".to_owned(),
        bio: Some("Lifts things".to_owned()),
        location: Some("   ".to_owned()),
    };
    let account = ctx
        .registration
        .update_profile(member.account.id, &update)
        .await
        .unwrap();
    assert_eq!(account.display_name, "Renamed");
    assert_eq!(account.bio.as_deref(), Some("Lifts things"));
    assert!(account.location.is_none());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invites_leave_one_affiliation() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: DatabaseUrl::SQLite {
            path: dir.path().join("gymn.db"),
        },
        ..DatabaseConfig::default()
    };
    let database = Database::new(&config).await.unwrap();
    let ctx = TestContext::with_database(database);

    let first = ctx.owner("a@x.com", "ownera").await;
    let second = ctx.owner("b@x.com", "ownerb").await;
    let member = ctx.member("m@x.com", "member1").await;

    let tasks = [first.account.id, second.account.id].map(|requester| {
        let service = ctx.affiliations.clone();
        tokio::spawn(async move {
            service
                .invite_existing(requester, &by_email("m@x.com"))
                .await
        })
    });

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert_eq!(e.category(), ErrorCategory::Conflict),
        }
    }
    assert_eq!(succeeded, 1);
    assert_eq!(
        ctx.store.find_by_user(member.account.id).await.unwrap().len(),
        1
    );
}

// ============================================================================
// Store failures
// ============================================================================

fn query_failure() -> DatabaseError {
    DatabaseError::QueryError {
        context: "disk I/O error".to_owned(),
    }
}

/// Directory that forwards to `SQLite` with a few operations overridden
struct FaultyDirectory {
    inner: DirectoryImpl,
    drop_password_writes: bool,
    fail_email_lookups: bool,
}

#[async_trait]
impl Directory for FaultyDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        if self.fail_email_lookups {
            return Err(query_failure());
        }
        self.inner.find_by_email(email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        self.inner.find_by_username(username).await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DatabaseError> {
        self.inner.exists_by_email(email).await
    }

    async fn create(&self, account: &Account) -> Result<Uuid, DatabaseError> {
        self.inner.create(account).await
    }

    async fn update_username(&self, id: Uuid, username: &str) -> Result<(), DatabaseError> {
        self.inner.update_username(id, username).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        if self.drop_password_writes {
            return Ok(());
        }
        self.inner.update_password(id, password_hash).await
    }

    async fn mark_verified(&self, id: Uuid) -> Result<(), DatabaseError> {
        self.inner.mark_verified(id).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.inner.delete(id).await
    }

    async fn delete_unverified(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.inner.delete_unverified(id).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        display_name: &str,
        bio: Option<&str>,
        location: Option<&str>,
    ) -> Result<(), DatabaseError> {
        self.inner
            .update_profile(id, display_name, bio, location)
            .await
    }
}

/// Affiliation store whose pending-to-active transition always fails
struct StuckAffiliations(AffiliationStoreImpl);

#[async_trait]
impl AffiliationStore for StuckAffiliations {
    async fn create(&self, affiliation: &Affiliation) -> Result<Uuid, DatabaseError> {
        self.0.create(affiliation).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Affiliation>, DatabaseError> {
        self.0.find_by_id(id).await
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError> {
        self.0.find_by_user(user_id).await
    }

    async fn list_by_gym(&self, gym_id: Uuid) -> Result<Vec<Affiliation>, DatabaseError> {
        self.0.list_by_gym(gym_id).await
    }

    async fn mark_verified(&self, _id: Uuid) -> Result<bool, DatabaseError> {
        Err(query_failure())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.0.delete(id).await
    }
}

/// Gym registry where every referral code is already taken
struct ExhaustedGyms(GymRegistryImpl);

#[async_trait]
impl GymRegistry for ExhaustedGyms {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Gym>, DatabaseError> {
        self.0.find_by_id(id).await
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Gym>, DatabaseError> {
        self.0.find_by_owner(owner_id).await
    }

    async fn find_by_referral_code(
        &self,
        code: &ReferralCode,
    ) -> Result<Option<Gym>, DatabaseError> {
        self.0.find_by_referral_code(code).await
    }

    async fn create(&self, _gym: &Gym) -> Result<Uuid, DatabaseError> {
        Err(DatabaseError::UniqueViolation {
            constraint: "UNIQUE constraint failed: gyms.referral_code".to_owned(),
        })
    }
}

async fn context_with(
    drop_password_writes: bool,
    fail_email_lookups: bool,
    stuck_affiliations: bool,
) -> TestContext {
    common::init_test_logging();
    let database = Database::in_memory().await.unwrap();
    let directory = Arc::new(FaultyDirectory {
        inner: DirectoryImpl::new(&database),
        drop_password_writes,
        fail_email_lookups,
    });
    let store: Arc<dyn AffiliationStore> = if stuck_affiliations {
        Arc::new(StuckAffiliations(AffiliationStoreImpl::new(&database)))
    } else {
        Arc::new(AffiliationStoreImpl::new(&database))
    };
    let gyms = Arc::new(GymRegistryImpl::new(&database));
    TestContext::with_stores(database, directory, gyms, store)
}

#[tokio::test]
async fn test_sign_in_failure_reports_stage_one() {
    let ctx = context_with(true, false, false).await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    ctx.affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    let token = next_invite_token(&mut events).await;

    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "newperson"))
        .await
        .unwrap_err();
    assert_eq!(err.stage, VerifyStage::SignIn);
    assert_eq!(err.stage.code(), 1);
}

#[tokio::test]
async fn test_profile_update_failure_reports_stage_two() {
    let ctx = context_with(false, false, true).await;
    let owner = ctx.owner("g@x.com", "gymowner").await;
    let mut events = ctx.notifications.subscribe();

    ctx.affiliations
        .invite_new(owner.account.id, "New Person", "n@x.com")
        .await
        .unwrap();
    let token = next_invite_token(&mut events).await;

    let err = ctx
        .affiliations
        .verify_new_account(&verify_request(&token, "n@x.com", "newperson"))
        .await
        .unwrap_err();
    assert_eq!(err.stage.code(), 2);
    assert_eq!(err.error.category(), ErrorCategory::UnknownError);
}

#[tokio::test]
async fn test_store_failure_is_unknown_error() {
    let ctx = context_with(false, true, false).await;
    let owner = ctx.owner("g@x.com", "gymowner").await;

    let err = ctx
        .affiliations
        .invite_existing(owner.account.id, &by_email("m@x.com"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::UnknownError);
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn test_owner_without_gym_is_rolled_back() {
    common::init_test_logging();
    let database = Database::in_memory().await.unwrap();
    let directory = Arc::new(DirectoryImpl::new(&database));
    let gyms = Arc::new(ExhaustedGyms(GymRegistryImpl::new(&database)));
    let store = Arc::new(AffiliationStoreImpl::new(&database));
    let ctx = TestContext::with_stores(database, directory, gyms, store);

    let err = ctx
        .registration
        .register(RegistrationForm::GymOwner {
            email: "g@x.com".to_owned(),
            username: "gymowner".to_owned(),
            display_name: "Gym Owner".to_owned(),
            password: TEST_PASSWORD.to_owned(),
            gym_name: "Iron Temple".to_owned(),
            gym_address: "Rua 7, #12".to_owned(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 500);

    assert!(ctx.directory.find_by_email("g@x.com").await.unwrap().is_none());
    assert!(ctx
        .directory
        .find_by_username("gymowner")
        .await
        .unwrap()
        .is_none());

    // Email and username are free again
    ctx.registration
        .register(member_form("g@x.com", "gymowner", TEST_PASSWORD))
        .await
        .unwrap();
}
