use axum::http::StatusCode;
use chrono::{Duration, Utc};
use domains::NewsRepo;
use integration_tests::{form, get, send, Harness, Options, HUMAN_TOKEN};
use serde_json::json;

#[tokio::test]
async fn home_page_is_public_and_may_be_empty() {
    let h = Harness::new().await;

    let reply = send(h.router(), get("/", None)).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!({ "latest_post_list": [] }));
    assert!(reply.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn home_page_shows_the_three_newest_posts() {
    let h = Harness::new().await;
    let now = Utc::now();
    for age in 1..=4 {
        h.post(&format!("post {age}"), now - Duration::minutes(age), None).await;
    }

    let reply = send(h.router(), get("/", None)).await;

    let titles: Vec<_> = reply.body["latest_post_list"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["newspost_title_text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["post 1", "post 2", "post 3"]);
}

#[tokio::test]
async fn anonymous_readers_are_sent_to_login() {
    let h = Harness::new().await;
    let post = h.post("Members only", Utc::now(), None).await;

    for path in ["/news/".to_string(), format!("/news/{}/", post.id)] {
        let reply = send(h.router(), get(&path, None)).await;
        assert_eq!(reply.status, StatusCode::FOUND, "{path}");
        assert_eq!(reply.location(), Some(format!("/login/?next={path}").as_str()));
    }
}

#[tokio::test]
async fn readers_without_permission_are_forbidden() {
    let h = Harness::new().await;
    let post = h.post("Members only", Utc::now(), None).await;
    let outsider = h.outsider("outsider").await;
    let auth = h.bearer(&outsider);

    let reply = send(h.router(), get(&format!("/news/{}/", post.id), Some(&auth))).await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["status"], 403);
}

#[tokio::test]
async fn empty_full_listing_is_not_found() {
    let h = Harness::new().await;
    let reader = h.member("reader").await;

    let reply = send(h.router(), get("/news/", Some(&h.bearer(&reader)))).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["status"], 404);
}

#[tokio::test]
async fn missing_post_is_not_found() {
    let h = Harness::new().await;
    let reader = h.member("reader").await;

    let reply = send(h.router(), get("/news/999/", Some(&h.bearer(&reader)))).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_view_carries_the_approved_thread() {
    let h = Harness::new().await;
    let reader = h.member("reader").await;
    let post = h.post("Launch", Utc::now(), Some(&reader)).await;
    h.comment(post.id, None, "hi", Some(&reader), true).await;
    h.comment(post.id, None, "pending", Some(&reader), false).await;

    let reply = send(h.router(), get(&format!("/news/{}/", post.id), Some(&h.bearer(&reader)))).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["p"]["id"], post.id.0);
    assert_eq!(reply.body["p"]["newspost_title_text"], "Launch");
    let comments = reply.body["comment_list"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["comment_text"], "hi");
    assert_eq!(comments[0]["comment_author_name"], "reader");
}

#[tokio::test]
async fn comment_submission_redirects_back_to_the_post() {
    let h = Harness::new().await;
    let reader = h.member("reader").await;
    let post = h.post("Launch", Utc::now(), None).await;
    let path = format!("/news/{}/comment/", post.id);

    let reply = send(
        h.router(),
        form(
            &path,
            Some(&h.bearer(&reader)),
            &format!("comment_text=nice+post&g-recaptcha-response={HUMAN_TOKEN}"),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some(format!("/news/{}/", post.id).as_str()));

    let stored = h.store.list_comments(post.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].comment_text, "nice post");
    assert!(!stored[0].approved_status);
}

#[tokio::test]
async fn comment_failing_the_bot_check_still_redirects_but_is_dropped() {
    let h = Harness::with_options(Options {
        bots_pass: false,
        ..Options::default()
    })
    .await;
    let reader = h.member("reader").await;
    let post = h.post("Launch", Utc::now(), None).await;

    let reply = send(
        h.router(),
        form(
            &format!("/news/{}/comment/", post.id),
            Some(&h.bearer(&reader)),
            "comment_text=spam&g-recaptcha-response=robot",
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), Some(format!("/news/{}/", post.id).as_str()));
    assert!(h.store.list_comments(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_comments_are_sent_to_login() {
    let h = Harness::new().await;
    let post = h.post("Launch", Utc::now(), None).await;

    let reply = send(
        h.router(),
        form(
            &format!("/news/{}/comment/", post.id),
            None,
            &format!("comment_text=hi&g-recaptcha-response={HUMAN_TOKEN}"),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(
        reply.location(),
        Some(format!("/login/?next=/news/{}/comment/", post.id).as_str())
    );
    assert!(h.store.list_comments(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn blank_comment_is_a_bad_request() {
    let h = Harness::new().await;
    let reader = h.member("reader").await;
    let post = h.post("Launch", Utc::now(), None).await;

    let reply = send(
        h.router(),
        form(
            &format!("/news/{}/comment/", post.id),
            Some(&h.bearer(&reader)),
            &format!("comment_text=+++&g-recaptcha-response={HUMAN_TOKEN}"),
        ),
    )
    .await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["status"], 400);
    assert!(h.store.list_comments(post.id).await.unwrap().is_empty());
}
