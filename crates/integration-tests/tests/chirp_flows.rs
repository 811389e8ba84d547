//! Chirp creation, listing and deletion through the request handlers.

use chirpy_api::{handlers, status_for, SortOrder, WebhookOutcome};
use chirpy_core::models::{Post, RecordKind};
use chirpy_core::traits::RecordRepo;
use integration_tests::{bearer, credentials, Harness, WEBHOOK_KEY};

fn login_as(h: &Harness, email: &str) -> String {
    handlers::register(&h.state, &credentials(email, "pw")).unwrap();
    handlers::login(&h.state, &credentials(email, "pw")).unwrap().token
}

#[test]
fn test_create_then_fetch_after_reopen() {
    let h = Harness::new();
    let token = login_as(&h, "a@x.com");

    let created = handlers::create_chirp(
        &h.state,
        Some(&bearer(&token)),
        br#"{"body":"fornax is not a word"}"#,
    )
    .unwrap();

    assert_eq!(created, Post { id: 1, body: "**** is not a word".into(), author_id: 1 });
    let fetched = h.reopen().get(RecordKind::Post, 1).unwrap().into_post().unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn test_delete_requires_authorship() {
    let h = Harness::new();
    // Accounts 1..=4 exist so the author lands on id 5 and the intruder on 6.
    for n in 1..=4 {
        handlers::register(&h.state, &credentials(&format!("filler{n}@x.com"), "pw")).unwrap();
    }
    let author = login_as(&h, "author@x.com");
    let intruder = login_as(&h, "intruder@x.com");

    let post = handlers::create_chirp(&h.state, Some(&bearer(&author)), br#"{"body":"mine"}"#).unwrap();
    assert_eq!(post.author_id, 5);

    let refused = handlers::delete_chirp(&h.state, Some(&bearer(&intruder)), post.id).unwrap_err();
    assert_eq!(status_for(&refused), 403);
    assert_eq!(handlers::list_chirps(&h.state, SortOrder::Asc).unwrap(), vec![post.clone()]);

    handlers::delete_chirp(&h.state, Some(&bearer(&author)), post.id).unwrap();
    assert!(handlers::list_chirps(&h.state, SortOrder::Asc).unwrap().is_empty());
}

#[test]
fn test_listing_orders_by_id() {
    let h = Harness::new();
    let token = login_as(&h, "a@x.com");
    for body in ["first", "second", "third"] {
        let payload = serde_json::to_vec(&serde_json::json!({ "body": body })).unwrap();
        handlers::create_chirp(&h.state, Some(&bearer(&token)), &payload).unwrap();
    }

    let bodies = |order| -> Vec<String> {
        handlers::list_chirps(&h.state, order)
            .unwrap()
            .into_iter()
            .map(|p| p.body)
            .collect()
    };
    assert_eq!(bodies(SortOrder::Asc), ["first", "second", "third"]);
    assert_eq!(bodies(SortOrder::Desc), ["third", "second", "first"]);
}

#[test]
fn test_webhook_upgrade_then_login_reports_it() {
    let h = Harness::new();
    login_as(&h, "a@x.com");

    let outcome = handlers::handle_webhook(
        &h.state,
        Some(&format!("ApiKey {WEBHOOK_KEY}")),
        br#"{"event":"user.upgraded","data":{"user_id":1}}"#,
    )
    .unwrap();
    assert_eq!(outcome, WebhookOutcome::Upgraded(1));

    let login = handlers::login(&h.state, &credentials("a@x.com", "pw")).unwrap();
    assert!(login.is_chirpy_red);
}
