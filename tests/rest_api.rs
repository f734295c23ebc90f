use refuge_backend::api;
use refuge_backend::config::{RefugeConfig, RefugePaths, SessionConfig};
use refuge_backend::database::Database;
use serde_json::json;
use tempfile::tempdir;
use tokio::time::{sleep, Duration};

fn next_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .unwrap()
        .port()
}

async fn wait_for_health(base_url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not become healthy in time");
}

fn session_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("build client")
}

async fn signup(client: &reqwest::Client, base_url: &str, username: &str) -> serde_json::Value {
    let resp = client
        .post(format!("{base_url}/auth/signup"))
        .json(&json!({
            "name": username.to_uppercase(),
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter2",
        }))
        .send()
        .await
        .expect("signup response");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("signup json")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rest_roundtrip() {
    let temp = tempdir().expect("tempdir");
    let port = next_port();
    let config = RefugeConfig::new(
        port,
        RefugePaths::from_base_dir(temp.path()).expect("paths"),
        SessionConfig::with_secret("integration-test-secret"),
    );

    let database = Database::connect(&config.paths).expect("connect");
    database.ensure_migrations().expect("migrations");

    let server = tokio::spawn(api::serve_http(config, database));

    let base_url = format!("http://127.0.0.1:{port}");
    wait_for_health(&base_url).await;

    let alice = session_client();
    let bob = session_client();

    let alice_user = signup(&alice, &base_url, "alice").await;
    let bob_user = signup(&bob, &base_url, "bob").await;
    let alice_id = alice_user.get("id").and_then(|v| v.as_str()).expect("alice id");
    let bob_id = bob_user.get("id").and_then(|v| v.as_str()).expect("bob id");

    // Session cookie from signup authenticates follow-up calls.
    let me: serde_json::Value = alice
        .get(format!("{base_url}/auth/me"))
        .send()
        .await
        .expect("me response")
        .json()
        .await
        .expect("me json");
    assert_eq!(me.get("username").and_then(|v| v.as_str()), Some("alice"));

    // No cookie means no access.
    let anonymous = reqwest::Client::new();
    let resp = anonymous
        .get(format!("{base_url}/posts"))
        .send()
        .await
        .expect("anonymous feed response");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    // Alice posts, Bob comments.
    let resp = alice
        .post(format!("{base_url}/posts/create"))
        .json(&json!({ "content": "hello refuge" }))
        .send()
        .await
        .expect("create post response");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let post: serde_json::Value = resp.json().await.expect("post json");
    let post_id = post.get("id").and_then(|v| v.as_str()).expect("post id");

    let resp = bob
        .post(format!("{base_url}/posts/{post_id}/comment"))
        .json(&json!({ "content": "hi alice" }))
        .send()
        .await
        .expect("comment response");
    assert!(resp.status().is_success());

    let details: serde_json::Value = alice
        .get(format!("{base_url}/posts/{post_id}"))
        .send()
        .await
        .expect("post details response")
        .json()
        .await
        .expect("details json");
    let comments = details
        .get("comments")
        .and_then(|v| v.as_array())
        .expect("comments array");
    assert_eq!(comments.len(), 1);
    assert_eq!(
        comments[0]
            .get("author")
            .and_then(|a| a.get("username"))
            .and_then(|v| v.as_str()),
        Some("bob")
    );

    let inbox: serde_json::Value = alice
        .get(format!("{base_url}/notifications"))
        .send()
        .await
        .expect("notifications response")
        .json()
        .await
        .expect("notifications json");
    let inbox = inbox.as_array().expect("notifications array");
    assert!(inbox
        .iter()
        .any(|n| n.get("kind").and_then(|v| v.as_str()) == Some("comment")));

    // Vote toggle: on, then off again.
    let outcome: serde_json::Value = bob
        .post(format!("{base_url}/posts/{post_id}/upvote"))
        .send()
        .await
        .expect("upvote response")
        .json()
        .await
        .expect("upvote json");
    assert_eq!(outcome.get("status").and_then(|v| v.as_str()), Some("up"));
    assert_eq!(
        outcome.get("up_votes").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let outcome: serde_json::Value = bob
        .post(format!("{base_url}/posts/{post_id}/upvote"))
        .send()
        .await
        .expect("second upvote response")
        .json()
        .await
        .expect("second upvote json");
    assert_eq!(outcome.get("status").and_then(|v| v.as_str()), Some("neutral"));

    // Connection request dance.
    let resp = alice
        .post(format!("{base_url}/connections/request/{bob_id}"))
        .send()
        .await
        .expect("request response");
    assert!(resp.status().is_success());

    let incoming: serde_json::Value = bob
        .get(format!("{base_url}/connections/requests"))
        .send()
        .await
        .expect("incoming response")
        .json()
        .await
        .expect("incoming json");
    let incoming = incoming.as_array().expect("incoming array");
    assert_eq!(incoming.len(), 1);
    let request_id = incoming[0]
        .get("id")
        .and_then(|v| v.as_str())
        .expect("request id");

    let resp = bob
        .put(format!("{base_url}/connections/accept/{request_id}"))
        .send()
        .await
        .expect("accept response");
    assert!(resp.status().is_success());

    let status: serde_json::Value = alice
        .get(format!("{base_url}/connections/status/{bob_id}"))
        .send()
        .await
        .expect("status response")
        .json()
        .await
        .expect("status json");
    assert_eq!(status.get("status").and_then(|v| v.as_str()), Some("connected"));

    let peers: serde_json::Value = bob
        .get(format!("{base_url}/connections"))
        .send()
        .await
        .expect("connections response")
        .json()
        .await
        .expect("connections json");
    let peers = peers.as_array().expect("connections array");
    assert!(peers
        .iter()
        .any(|p| p.get("id").and_then(|v| v.as_str()) == Some(alice_id)));

    let inbox: serde_json::Value = alice
        .get(format!("{base_url}/notifications"))
        .send()
        .await
        .expect("notifications response")
        .json()
        .await
        .expect("notifications json");
    assert!(inbox
        .as_array()
        .expect("notifications array")
        .iter()
        .any(|n| n.get("kind").and_then(|v| v.as_str()) == Some("connection_accepted")));

    // Deleting the post takes its comments with it.
    let resp = alice
        .delete(format!("{base_url}/posts/delete/{post_id}"))
        .send()
        .await
        .expect("delete response");
    assert!(resp.status().is_success());

    let resp = alice
        .get(format!("{base_url}/posts/{post_id}"))
        .send()
        .await
        .expect("deleted post response");
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    // Logout invalidates the cookie.
    let resp = alice
        .post(format!("{base_url}/auth/logout"))
        .send()
        .await
        .expect("logout response");
    assert!(resp.status().is_success());
    let resp = alice
        .get(format!("{base_url}/auth/me"))
        .send()
        .await
        .expect("me after logout response");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    server.abort();
    let _ = server.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn login_and_profile_flow() {
    let temp = tempdir().expect("tempdir");
    let port = next_port();
    let config = RefugeConfig::new(
        port,
        RefugePaths::from_base_dir(temp.path()).expect("paths"),
        SessionConfig::with_secret("integration-test-secret"),
    );

    let database = Database::connect(&config.paths).expect("connect");
    database.ensure_migrations().expect("migrations");

    let server = tokio::spawn(api::serve_http(config, database));

    let base_url = format!("http://127.0.0.1:{port}");
    wait_for_health(&base_url).await;

    let client = session_client();
    signup(&client, &base_url, "carol").await;

    // Fresh client, wrong then right credentials.
    let login_client = session_client();
    let resp = login_client
        .post(format!("{base_url}/auth/login"))
        .json(&json!({ "username": "carol", "password": "wrong" }))
        .send()
        .await
        .expect("bad login response");
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let resp = login_client
        .post(format!("{base_url}/auth/login"))
        .json(&json!({ "username": "carol", "password": "hunter2" }))
        .send()
        .await
        .expect("login response");
    assert!(resp.status().is_success());

    let resp = login_client
        .put(format!("{base_url}/users/profile"))
        .json(&json!({ "bio": "keeper of the refuge" }))
        .send()
        .await
        .expect("profile update response");
    assert!(resp.status().is_success());

    let resp = login_client
        .post(format!("{base_url}/posts/create"))
        .json(&json!({ "content": "first light" }))
        .send()
        .await
        .expect("post response");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    let profile: serde_json::Value = login_client
        .get(format!("{base_url}/users/carol"))
        .send()
        .await
        .expect("profile response")
        .json()
        .await
        .expect("profile json");
    assert_eq!(
        profile
            .get("user")
            .and_then(|u| u.get("bio"))
            .and_then(|v| v.as_str()),
        Some("keeper of the refuge")
    );
    assert_eq!(
        profile.get("posts").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let resp = login_client
        .get(format!("{base_url}/users/nobody"))
        .send()
        .await
        .expect("missing profile response");
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    server.abort();
    let _ = server.await;
}
