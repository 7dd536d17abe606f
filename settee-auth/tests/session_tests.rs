use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use settee::{Client, Config, Error};
use settee_auth::{
    ConfAdminStore, Credentials, Sessions, UserStore, UsersDbStore, create_token, decode_token,
    hash_password,
};
use settee_memory::{MemoryClient, MemoryConfig};
use std::sync::Arc;

const T0: i64 = 1_700_000_000;

async fn config_with_admin(timeout: Option<&str>) -> Config {
    let mut config = MemoryConfig::new().with("admins", "bob", &hash_password("secret", "s4lt", 10));
    if let Some(timeout) = timeout {
        config = config.with("couch_httpd_auth", "timeout", timeout);
    }
    let client = Client::from_driver(Box::new(MemoryClient::new().with_config(config)));
    client.config().await.unwrap()
}

fn creds(name: &str, password: &str) -> Credentials {
    Credentials {
        name: Some(name.to_string()),
        password: password.to_string(),
    }
}

async fn admin_sessions(timeout: Option<&str>) -> (Sessions, Config) {
    let config = config_with_admin(timeout).await;
    let store = Arc::new(ConfAdminStore::new(config.clone()));
    (Sessions::new(store, config.clone()), config)
}

// ── ConfAdminStore ──────────────────────────────────────────────

#[tokio::test]
async fn admin_store_validates_passwords() {
    let config = config_with_admin(None).await;
    let store = ConfAdminStore::new(config.clone());

    let user = store.validate("bob", "secret").await.unwrap();
    assert_eq!(user.name, "bob");
    assert!(user.is_admin());
    assert_eq!(user.salt, "s4lt");

    assert!(matches!(store.validate("bob", "nope").await, Err(Error::Unauthorized(_))));
    assert!(matches!(store.validate("eve", "secret").await, Err(Error::Unauthorized(_))));
    assert!(store.user_ctx("eve").await.unwrap_err().is_not_found());

    config.set("admins", "broken", "plaintext").await.unwrap();
    assert!(matches!(store.user_ctx("broken").await, Err(Error::Internal(_))));
    assert!(matches!(store.validate("broken", "x").await, Err(Error::Internal(_))));
}

// ── UsersDbStore ────────────────────────────────────────────────

#[tokio::test]
async fn users_db_store_reads_user_documents() {
    let client = Client::from_driver(Box::new(MemoryClient::new()));
    client.create_db("users").await.unwrap();
    let db = client.db("users").await.unwrap();

    let key = {
        let hash = hash_password("hunter2", "pepper", 5);
        hash.trim_start_matches("-pbkdf2-").split(',').next().unwrap().to_string()
    };
    db.put(
        "org.couchdb.user:alice",
        &json!({
            "name": "alice",
            "roles": ["editor"],
            "password_scheme": "pbkdf2",
            "derived_key": key,
            "salt": "pepper",
            "iterations": 5,
        }),
    )
    .await
    .unwrap();
    db.put("org.couchdb.user:mallory", &json!({"name": "mallory"}))
        .await
        .unwrap();

    let store = UsersDbStore::new(db);
    let user = store.validate("alice", "hunter2").await.unwrap();
    assert!(user.has_role("editor"));
    assert!(!user.is_admin());
    assert!(matches!(store.validate("alice", "wrong").await, Err(Error::Unauthorized(_))));
    assert!(matches!(store.validate("nobody", "x").await, Err(Error::Unauthorized(_))));
    assert!(store.user_ctx("nobody").await.unwrap_err().is_not_found());
    assert!(matches!(store.user_ctx("mallory").await, Err(Error::Internal(_))));
}

// ── Login ───────────────────────────────────────────────────────

#[tokio::test]
async fn login_issues_a_token_for_the_user() {
    let (sessions, _) = admin_sessions(None).await;
    let login = sessions
        .login_at(&creds("bob", "secret"), None, T0)
        .await
        .unwrap();
    assert_eq!(login.user.name, "bob");
    assert_eq!(login.max_age, 600);
    assert_eq!(login.redirect, None);
    assert_eq!(decode_token(&login.token).unwrap(), ("bob".to_string(), T0));
    assert_eq!(login.token, create_token("bob", "s4lt", T0).unwrap());
}

#[tokio::test]
async fn login_requires_a_name() {
    let (sessions, _) = admin_sessions(None).await;
    let err = sessions
        .login_at(&Credentials::default(), None, T0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let (sessions, _) = admin_sessions(None).await;
    let err = sessions
        .login_at(&creds("bob", "guess"), None, T0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn bad_redirect_rejects_correct_credentials() {
    let (sessions, _) = admin_sessions(None).await;
    let err = sessions
        .login_at(&creds("bob", "secret"), Some("//evil.example"), T0)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    let ok = sessions
        .login_at(&creds("bob", "secret"), Some("/_utils"), T0)
        .await
        .unwrap();
    assert_eq!(ok.redirect.as_deref(), Some("/_utils"));
}

#[tokio::test]
async fn timeout_comes_from_config() {
    let (sessions, _) = admin_sessions(Some("42")).await;
    assert_eq!(sessions.timeout().await.unwrap(), 42);

    let (sessions, _) = admin_sessions(Some("soon")).await;
    assert!(matches!(sessions.timeout().await, Err(Error::Internal(_))));
}

// ── Validation ──────────────────────────────────────────────────

#[tokio::test]
async fn token_valid_within_timeout_only() {
    let (sessions, _) = admin_sessions(Some("600")).await;
    let token = sessions
        .login_at(&creds("bob", "secret"), None, T0)
        .await
        .unwrap()
        .token;

    for now in [T0, T0 + 1, T0 + 599] {
        let user = sessions.validate_at(Some(&token), now).await;
        assert_eq!(user.map(|u| u.name).as_deref(), Some("bob"), "at {now}");
    }
    assert!(sessions.validate_at(Some(&token), T0 + 600).await.is_none());
    assert!(sessions.validate_at(Some(&token), T0 - 1).await.is_none());
}

#[tokio::test]
async fn salt_change_invalidates_outstanding_sessions() {
    let (sessions, config) = admin_sessions(None).await;
    let token = sessions
        .login_at(&creds("bob", "secret"), None, T0)
        .await
        .unwrap()
        .token;
    assert!(sessions.validate_at(Some(&token), T0 + 1).await.is_some());

    config
        .set("admins", "bob", &hash_password("secret", "n3w", 10))
        .await
        .unwrap();
    assert!(sessions.validate_at(Some(&token), T0 + 1).await.is_none());
}

#[tokio::test]
async fn every_validation_failure_is_anonymous() {
    let (sessions, config) = admin_sessions(None).await;
    assert!(sessions.validate_at(None, T0).await.is_none());
    assert!(sessions.validate_at(Some("not a token"), T0).await.is_none());

    let forged = create_token("bob", "guessed-salt", T0).unwrap();
    assert!(sessions.validate_at(Some(&forged), T0).await.is_none());

    let unknown = create_token("eve", "s4lt", T0).unwrap();
    assert!(sessions.validate_at(Some(&unknown), T0).await.is_none());

    config.set("admins", "broken", "plaintext").await.unwrap();
    let broken = create_token("broken", "", T0).unwrap();
    assert!(sessions.validate_at(Some(&broken), T0).await.is_none());
}

#[tokio::test]
async fn login_against_users_database() {
    let client = Client::from_driver(Box::new(MemoryClient::new()));
    client.create_db("users").await.unwrap();
    let db = client.db("users").await.unwrap();
    let hash = hash_password("pw", "salt", 3);
    let key = hash.trim_start_matches("-pbkdf2-").split(',').next().unwrap();
    db.put(
        "org.couchdb.user:carol",
        &json!({"name": "carol", "roles": [], "password_scheme": "pbkdf2",
                "derived_key": key, "salt": "salt", "iterations": 3}),
    )
    .await
    .unwrap();

    let sessions = Sessions::new(
        Arc::new(UsersDbStore::new(db)),
        client.config().await.unwrap(),
    );
    let login = sessions.login_at(&creds("carol", "pw"), None, T0).await.unwrap();
    let user = sessions.validate_at(Some(&login.token), T0 + 10).await.unwrap();
    assert_eq!(user.name, "carol");
    assert!(user.roles.is_empty());
}

proptest! {
    #[test]
    fn tokens_decode_to_their_inputs(name in "[a-z][a-z0-9_]{0,15}", ts in 0i64..=i64::MAX / 2) {
        let token = create_token(&name, "salt", ts).unwrap();
        prop_assert_eq!(decode_token(&token).unwrap(), (name, ts));
    }
}
