//! End-to-end tests for the moderation surface
//!
//! These tests boot the real router against live PostgreSQL and Redis
//! (`DATABASE_URL` / `REDIS_URL`), drive it over HTTP with a cookie-holding
//! client, and verify the vote, report, and status invariants. Run with:
//!
//! ```sh
//! cargo test -p api -- --ignored
//! ```

use serde_json::{Value, json};
use serial_test::serial;
use uuid::Uuid;

use api::moderation::{ModerationConfig, ModerationEngine};
use api::state::AppState;

async fn spawn_app() -> (String, AppState) {
    let state = api::build_state().await.expect("failed to build app state");
    serve(state).await
}

/// Boots the app with the given moderation config instead of the
/// environment's, so threshold and dedupe variants can be tested without
/// touching process-wide state.
async fn spawn_app_with_moderation(config: ModerationConfig) -> (String, AppState) {
    let mut state = api::build_state().await.expect("failed to build app state");
    state.moderation = ModerationEngine::new(state.post_repository.clone(), config);
    serve(state).await
}

async fn serve(state: AppState) -> (String, AppState) {
    let app = api::routes::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind");
    let addr = listener.local_addr().expect("no local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    (format!("http://{}", addr), state)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("failed to build client")
}

/// Registers a fresh user and logs the given client in as them.
/// Returns the user's id.
async fn register_and_login(base: &str, http: &reqwest::Client) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    let email = format!("user{}@example.com", &suffix[..12]);

    let response = http
        .post(format!("{}/auth/users/register", base))
        .json(&json!({
            "username": format!("user_{}", &suffix[..12]),
            "phone": format!("9{:09}", rand_digits(&suffix)),
            "aadhar": format!("1{:011}", rand_digits(&suffix)),
            "email": email,
            "password": "Str0ng!pass",
        }))
        .send()
        .await
        .expect("register failed");
    assert_eq!(response.status(), 201, "registration should succeed");

    let user: Value = response.json().await.expect("bad register body");
    let id: Uuid = user["id"].as_str().expect("no id").parse().expect("bad id");

    let response = http
        .post(format!("{}/auth/users/login", base))
        .json(&json!({"email": email, "password": "Str0ng!pass"}))
        .send()
        .await
        .expect("login failed");
    assert_eq!(response.status(), 200, "login should succeed");

    id
}

/// Derives a numeric tail from a uuid so phone/aadhar stay unique per user.
fn rand_digits(suffix: &str) -> u64 {
    suffix
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
        % 1_000_000_000
}

/// Promotes an already-registered user to admin directly in the database;
/// role changes are deliberately not reachable through the API.
async fn promote_to_admin(state: &AppState, user_id: Uuid) {
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user_id)
        .execute(&state.db_pool)
        .await
        .expect("failed to promote admin");
}

async fn create_post(base: &str, http: &reqwest::Client) -> Uuid {
    let response = http
        .post(format!("{}/auth/posts", base))
        .json(&json!({
            "title": "Pothole",
            "description": "Large pothole",
            "image": "data:image/png;base64,AAAA",
            "location": {"latitude": 37.0, "longitude": -122.0, "address": "Main St"},
            "tags": ["road"],
        }))
        .send()
        .await
        .expect("create post failed");
    assert_eq!(response.status(), 201);

    let post: Value = response.json().await.expect("bad post body");
    assert_eq!(post["status"], "pending");
    assert_eq!(post["reportCount"], 0);

    post["id"].as_str().expect("no post id").parse().expect("bad post id")
}

async fn get_post(base: &str, http: &reqwest::Client, id: Uuid) -> Value {
    let response = http
        .get(format!("{}/auth/posts/public", base))
        .send()
        .await
        .expect("list failed");
    assert_eq!(response.status(), 200);

    let posts: Vec<Value> = response.json().await.expect("bad list body");
    posts
        .into_iter()
        .find(|p| p["id"] == id.to_string())
        .expect("post not in public feed")
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn end_to_end_moderation_scenario() {
    let (base, state) = spawn_app().await;

    // User A creates a post.
    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    // User B upvotes it.
    let voter = client();
    let voter_id = register_and_login(&base, &voter).await;
    let response = voter
        .post(format!("{}/auth/posts/{}/upvote", base, post_id))
        .send()
        .await
        .expect("upvote failed");
    assert_eq!(response.status(), 200);
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["upvotes"].as_array().unwrap().len(), 1);
    assert_eq!(post["upvotes"][0], voter_id.to_string());

    // User C reports it.
    let reporter = client();
    register_and_login(&base, &reporter).await;
    let response = reporter
        .post(format!("{}/auth/posts/{}/report", base, post_id))
        .json(&json!({"reason": "spam"}))
        .send()
        .await
        .expect("report failed");
    assert_eq!(response.status(), 200);

    let response = reporter
        .get(format!("{}/auth/posts/{}/reports", base, post_id))
        .send()
        .await
        .unwrap();
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["reportCount"], 1);
    assert_eq!(status["reportsThreshold"], 5);
    assert_eq!(status["exceedsThreshold"], false);
    assert_eq!(status["reports"].as_array().unwrap().len(), 1);

    // Admin clears reports and resolves the post.
    let admin = client();
    let admin_id = register_and_login(&base, &admin).await;
    promote_to_admin(&state, admin_id).await;
    // Re-login so the session carries the admin role.
    let admin_user = state
        .user_repository
        .find_by_id(admin_id)
        .await
        .unwrap()
        .unwrap();
    let response = admin
        .post(format!("{}/auth/admin/login", base))
        .json(&json!({"email": admin_user.email, "password": "Str0ng!pass"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = admin
        .post(format!("{}/auth/admin/posts/{}/clear-reports", base, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["post"]["reportCount"], 0);

    let response = admin
        .put(format!("{}/auth/admin/posts/{}/status", base, post_id))
        .json(&json!({"status": "resolved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["status"], "resolved");
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn vote_exclusivity_idempotence_and_toggle() {
    let (base, _state) = spawn_app().await;

    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    let voter = client();
    let voter_id = register_and_login(&base, &voter).await;
    let upvote_url = format!("{}/auth/posts/{}/upvote", base, post_id);
    let downvote_url = format!("{}/auth/posts/{}/downvote", base, post_id);

    // Upvoting twice is idempotent.
    voter.post(&upvote_url).send().await.unwrap();
    let response = voter.post(&upvote_url).send().await.unwrap();
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["upvotes"].as_array().unwrap().len(), 1);
    assert_eq!(post["downvotes"].as_array().unwrap().len(), 0);

    // Downvoting replaces the upvote; the voter is never in both sets.
    let response = voter.post(&downvote_url).send().await.unwrap();
    let post: Value = response.json().await.unwrap();
    assert_eq!(post["upvotes"].as_array().unwrap().len(), 0);
    assert_eq!(post["downvotes"].as_array().unwrap().len(), 1);
    assert_eq!(post["downvotes"][0], voter_id.to_string());
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn non_author_cannot_update_or_delete() {
    let (base, _state) = spawn_app().await;

    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    let other = client();
    register_and_login(&base, &other).await;

    let response = other
        .put(format!("{}/auth/posts/{}", base, post_id))
        .json(&json!({"title": "Hijacked"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = other
        .delete(format!("{}/auth/posts/{}", base, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // The post is unmodified and still retrievable.
    let post = get_post(&base, &other, post_id).await;
    assert_eq!(post["title"], "Pothole");
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn admin_routes_reject_ordinary_users() {
    let (base, _state) = spawn_app().await;

    let user = client();
    register_and_login(&base, &user).await;

    let response = user
        .get(format!("{}/auth/admin/reported-posts", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn report_count_tracks_report_sequence() {
    let (base, _state) = spawn_app().await;

    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    let reporter = client();
    register_and_login(&base, &reporter).await;

    // Without dedupe the same reporter may report repeatedly.
    for _ in 0..3 {
        let response = reporter
            .post(format!("{}/auth/posts/{}/report", base, post_id))
            .json(&json!({"reason": "spam"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = reporter
        .get(format!("{}/auth/posts/{}/reports", base, post_id))
        .send()
        .await
        .unwrap();
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["reportCount"], 3);
    assert_eq!(
        status["reports"].as_array().unwrap().len(),
        3,
        "reportCount must equal the report sequence length"
    );

    // A blank reason never reaches storage.
    let response = reporter
        .post(format!("{}/auth/posts/{}/report", base, post_id))
        .json(&json!({"reason": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn repeat_reports_are_ignored_when_dedupe_is_on() {
    let (base, _state) = spawn_app_with_moderation(ModerationConfig {
        dedupe_reports: true,
        ..ModerationConfig::default()
    })
    .await;

    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    let reporter = client();
    register_and_login(&base, &reporter).await;

    // The repeat report succeeds but changes nothing.
    for _ in 0..2 {
        let response = reporter
            .post(format!("{}/auth/posts/{}/report", base, post_id))
            .json(&json!({"reason": "spam"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = reporter
        .get(format!("{}/auth/posts/{}/reports", base, post_id))
        .send()
        .await
        .unwrap();
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["reportCount"], 1, "repeat report must not count");
    assert_eq!(status["reports"].as_array().unwrap().len(), 1);

    // A different reporter still counts.
    let other = client();
    register_and_login(&base, &other).await;
    let response = other
        .post(format!("{}/auth/posts/{}/report", base, post_id))
        .json(&json!({"reason": "duplicate issue"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = other
        .get(format!("{}/auth/posts/{}/reports", base, post_id))
        .send()
        .await
        .unwrap();
    let status: Value = response.json().await.unwrap();
    assert_eq!(status["reportCount"], 2);
    assert_eq!(status["reports"].as_array().unwrap().len(), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn resolved_status_can_be_set_again() {
    let (base, state) = spawn_app().await;

    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    let admin = client();
    let admin_id = register_and_login(&base, &admin).await;
    promote_to_admin(&state, admin_id).await;
    let admin_user = state
        .user_repository
        .find_by_id(admin_id)
        .await
        .unwrap()
        .unwrap();
    admin
        .post(format!("{}/auth/admin/login", base))
        .json(&json!({"email": admin_user.email, "password": "Str0ng!pass"}))
        .send()
        .await
        .unwrap();

    let status_url = format!("{}/auth/admin/posts/{}/status", base, post_id);
    for _ in 0..2 {
        let response = admin
            .put(&status_url)
            .json(&json!({"status": "resolved"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let post: Value = response.json().await.unwrap();
        assert_eq!(post["status"], "resolved");
    }

    // Unknown status values are rejected before any write.
    let response = admin
        .put(&status_url)
        .json(&json!({"status": "closed"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[serial]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn concurrent_upvotes_are_never_lost() {
    let (base, _state) = spawn_app().await;

    let author = client();
    register_and_login(&base, &author).await;
    let post_id = create_post(&base, &author).await;

    const VOTERS: usize = 10;

    let mut handles = Vec::new();
    for _ in 0..VOTERS {
        let base = base.clone();
        handles.push(tokio::spawn(async move {
            let voter = client();
            register_and_login(&base, &voter).await;
            let response = voter
                .post(format!("{}/auth/posts/{}/upvote", base, post_id))
                .send()
                .await
                .expect("upvote failed");
            assert_eq!(response.status(), 200);
        }));
    }

    for handle in handles {
        handle.await.expect("voter task panicked");
    }

    let post = get_post(&base, &author, post_id).await;
    let upvotes = post["upvotes"].as_array().unwrap();
    assert_eq!(upvotes.len(), VOTERS, "no concurrent vote may be dropped");

    let mut distinct: Vec<&str> = upvotes.iter().map(|v| v.as_str().unwrap()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct.len(), VOTERS, "all voters must be distinct");
}
