use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use tokio::sync::{mpsc, Semaphore};

use crate::{
    api::{ApiError, PostsApi, RemoteError},
    app::{self, App, Event, UiEvent},
    components::Key,
    config::OutputFormat,
    identity::{Identity, SessionState},
    model::{CreatePost, Post, PostWithAuthor},
    view::Node,
};

pub mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use url::Url;

    use crate::{
        identity::CurrentUser,
        model::{Author, Post, PostWithAuthor},
    };

    pub fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 4, 1, 12, 0, 0).unwrap()
    }

    pub fn author(username: &str) -> Author {
        Author {
            id: format!("user_{}", username),
            username: username.to_string(),
            profile_image_url: Url::parse(&format!("https://img.example.com/{}.png", username))
                .unwrap(),
        }
    }

    pub fn post(id: &str, content: &str) -> Post {
        Post {
            id: id.to_string(),
            content: content.to_string(),
            created_at: created_at(),
            author_id: "user_ferris".to_string(),
        }
    }

    pub fn post_with_author(id: &str, username: &str, content: &str) -> PostWithAuthor {
        let author = author(username);
        let mut post = post(id, content);
        post.author_id = author.id.clone();
        PostWithAuthor { post, author }
    }

    pub fn current_user() -> CurrentUser {
        CurrentUser {
            id: "user_ferris".to_string(),
            username: Some("ferris".to_string()),
            profile_image_url: Url::parse("https://img.example.com/ferris.png").unwrap(),
        }
    }
}

type Failure = Box<dyn Fn() -> ApiError + Send + Sync>;

/// In-memory `posts` router. New posts go to the front, like the real
/// newest-first ordering.
#[derive(Default)]
pub struct FakeApi {
    posts: Mutex<Vec<PostWithAuthor>>,
    get_calls: AtomicUsize,
    create_calls: AtomicUsize,
    fail_reads: AtomicBool,
    create_failure: Mutex<Option<Failure>>,
    read_gate: Option<Semaphore>,
    create_gate: Option<Semaphore>,
}

impl FakeApi {
    pub fn with_posts(posts: Vec<PostWithAuthor>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    /// Reads wait for `release`.
    pub fn gated(mut self) -> Self {
        self.read_gate = Some(Semaphore::new(0));
        self
    }

    /// Creates wait for `release_creates`.
    pub fn gated_creates(mut self) -> Self {
        self.create_gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, reads: usize) {
        if let Some(gate) = &self.read_gate {
            gate.add_permits(reads);
        }
    }

    pub fn release_creates(&self, creates: usize) {
        if let Some(gate) = &self.create_gate {
            gate.add_permits(creates);
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_creates(&self, failure: impl Fn() -> ApiError + Send + Sync + 'static) {
        *self.create_failure.lock().unwrap() = Some(Box::new(failure));
    }

    pub fn push(&self, item: PostWithAuthor) {
        self.posts.lock().unwrap().insert(0, item);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

async fn pass(gate: &Option<Semaphore>) {
    if let Some(gate) = gate {
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
    }
}

impl PostsApi for FakeApi {
    async fn get_all(&self) -> Result<Vec<PostWithAuthor>, ApiError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        pass(&self.read_gate).await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ApiError::Status(500));
        }
        let posts = self.posts.lock().unwrap().clone();
        Ok(posts)
    }

    async fn create(&self, input: CreatePost) -> Result<Post, ApiError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        pass(&self.create_gate).await;
        let failure = self.create_failure.lock().unwrap().as_ref().map(|f| f());
        if let Some(error) = failure {
            return Err(error);
        }

        let item = fixtures::post_with_author(&format!("new-{}", n), "ferris", &input.content);
        self.push(item.clone());
        Ok(item.post)
    }
}

pub struct StaticIdentity(pub SessionState);

impl Identity for StaticIdentity {
    async fn load(&self) -> Result<SessionState, ApiError> {
        Ok(self.0.clone())
    }
}

fn app_with(
    api: FakeApi,
    session: SessionState,
) -> (
    Arc<FakeApi>,
    App<FakeApi, StaticIdentity>,
    mpsc::UnboundedReceiver<Event>,
) {
    let api = Arc::new(api);
    let (tx, rx) = mpsc::unbounded_channel();
    let app = App::new(api.clone(), Arc::new(StaticIdentity(session)), "/sign-in", tx);
    (api, app, rx)
}

fn signed_in() -> SessionState {
    SessionState::signed_in(fixtures::current_user())
}

fn feed_keys(view: &Node) -> Vec<String> {
    view.components("post-view")
        .iter()
        .filter_map(|e| e.get("data-key"))
        .map(str::to_string)
        .collect()
}

fn toasts(view: &Node) -> String {
    view.components("toaster")[0].text()
}

fn input_value(view: &Node) -> String {
    view.find_all(&|e| e.tag == "input")[0]
        .get("value")
        .unwrap_or_default()
        .to_string()
}

async fn submit(
    app: &mut App<FakeApi, StaticIdentity>,
    events: &mut mpsc::UnboundedReceiver<Event>,
    text: &str,
) {
    app.handle(Event::Ui(UiEvent::Input(text.to_string())));
    app.handle(Event::Ui(UiEvent::KeyDown(Key::Enter)));
    app::settle(app, events).await;
}

#[tokio::test]
async fn signed_out_page_shows_feed_with_one_fetch() {
    let posts = vec![
        fixtures::post_with_author("b", "corro", "second"),
        fixtures::post_with_author("a", "ferris", "first"),
    ];
    let (api, mut app, mut events) = app_with(FakeApi::with_posts(posts), SessionState::signed_out());

    app.mount();
    app::settle(&mut app, &mut events).await;

    let view = app.view(fixtures::created_at());
    assert_eq!(view.components("sign-in").len(), 1);
    assert!(view.components("create-post-wizard").is_empty());
    assert_eq!(feed_keys(&view), vec!["b", "a"]);
    assert_eq!(api.get_calls(), 1);
}

#[tokio::test]
async fn successful_post_clears_input_and_refreshes_feed() {
    let posts = vec![fixtures::post_with_author("a", "corro", "first")];
    let (api, mut app, mut events) = app_with(FakeApi::with_posts(posts), signed_in());
    app.mount();
    app::settle(&mut app, &mut events).await;

    submit(&mut app, &mut events, "🦀🦀").await;

    let view = app.view(fixtures::created_at());
    assert_eq!(api.create_calls(), 1);
    assert_eq!(api.get_calls(), 2);
    assert_eq!(input_value(&view), "");
    assert_eq!(feed_keys(&view), vec!["new-1", "a"]);
    assert!(view.components("post-view")[0].text().ends_with("🦀🦀"));
}

#[tokio::test]
async fn blank_post_makes_no_call() {
    let (api, mut app, mut events) = app_with(FakeApi::default(), signed_in());
    app.mount();
    app::settle(&mut app, &mut events).await;

    submit(&mut app, &mut events, "   ").await;
    app.handle(Event::Ui(UiEvent::ClickPost));
    app::settle(&mut app, &mut events).await;

    assert_eq!(api.create_calls(), 0);
    assert_eq!(api.get_calls(), 1);
}

#[tokio::test]
async fn validation_failure_toasts_message_and_keeps_input() {
    let (api, mut app, mut events) = app_with(FakeApi::default(), signed_in());
    api.fail_creates(|| {
        ApiError::Remote(
            RemoteError::new("validation")
                .with_field_error("content", "Content must not exceed 280 characters"),
        )
    });
    app.mount();
    app::settle(&mut app, &mut events).await;

    submit(&mut app, &mut events, "too long").await;

    let view = app.view(chrono::Utc::now());
    assert_eq!(toasts(&view), "Content must not exceed 280 characters");
    assert_eq!(input_value(&view), "too long");
    assert_eq!(api.get_calls(), 1);
}

#[tokio::test]
async fn unstructured_failure_toasts_generic_message() {
    let (api, mut app, mut events) = app_with(FakeApi::default(), signed_in());
    api.fail_creates(|| ApiError::Status(502));
    app.mount();
    app::settle(&mut app, &mut events).await;

    submit(&mut app, &mut events, "🦀").await;

    let view = app.view(chrono::Utc::now());
    assert_eq!(toasts(&view), "Something went wrong");
    assert_eq!(input_value(&view), "🦀");
}

#[tokio::test]
async fn failed_feed_shows_error_without_retry() {
    let api = FakeApi::default();
    api.fail_reads(true);
    let (api, mut app, mut events) = app_with(api, SessionState::signed_out());
    app.mount();
    app::settle(&mut app, &mut events).await;

    let view = app.view(chrono::Utc::now());
    assert_eq!(view.components("feed-error")[0].text(), "Something went wrong");
    assert_eq!(api.get_calls(), 1);
}

#[tokio::test]
async fn signing_out_mid_flight_drops_the_create() {
    let (api, mut app, mut events) = app_with(FakeApi::default().gated_creates(), signed_in());
    app.mount();
    app::settle(&mut app, &mut events).await;

    app.handle(Event::Ui(UiEvent::Input("🦀".to_string())));
    app.handle(Event::Ui(UiEvent::KeyDown(Key::Enter)));
    tokio::task::yield_now().await;
    assert_eq!(api.create_calls(), 1);

    app.handle(Event::SessionLoaded(SessionState::signed_out()));
    api.release_creates(1);
    app::settle(&mut app, &mut events).await;
    tokio::task::yield_now().await;

    let view = app.view(chrono::Utc::now());
    assert!(view.components("create-post-wizard").is_empty());
    assert_eq!(view.components("sign-in").len(), 1);
    assert!(events.try_recv().is_err());
    assert_eq!(api.get_calls(), 1);
}

#[tokio::test]
async fn render_once_prints_html_frame() {
    let posts = vec![fixtures::post_with_author("a", "ferris", "hello <world>")];
    let (_, app, events) = app_with(FakeApi::with_posts(posts), SessionState::signed_out());

    let mut out = Vec::new();
    app::render_once(app, events, &mut out, OutputFormat::Html)
        .await
        .unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains(r#"<a href="/@ferris">@ferris</a>"#));
    assert!(out.contains("hello &lt;world&gt;"));
    assert!(out.trim_end().ends_with("---"));
}

#[tokio::test]
async fn post_once_requires_sign_in() {
    let (api, app, events) = app_with(FakeApi::default(), SessionState::signed_out());

    let mut out = Vec::new();
    let result = app::post_once(app, events, "🦀".to_string(), &mut out, OutputFormat::Markdown).await;

    assert!(result.is_err());
    assert_eq!(api.create_calls(), 0);
}

#[tokio::test]
async fn post_once_reports_rejected_post() {
    let (api, app, events) = app_with(FakeApi::default(), signed_in());
    api.fail_creates(|| ApiError::Status(500));

    let mut out = Vec::new();
    let result = app::post_once(app, events, "🦀".to_string(), &mut out, OutputFormat::Html).await;

    assert!(result.is_err());
    assert_eq!(api.create_calls(), 1);
    assert!(String::from_utf8(out).unwrap().contains("Something went wrong"));
}

#[tokio::test]
async fn post_once_prints_new_post() {
    let (api, app, events) = app_with(FakeApi::default(), signed_in());

    let mut out = Vec::new();
    app::post_once(app, events, "🦀".to_string(), &mut out, OutputFormat::Html)
        .await
        .unwrap();

    assert_eq!(api.create_calls(), 1);
    assert!(String::from_utf8(out).unwrap().contains(r#"data-key="new-1""#));
}

#[tokio::test]
async fn stale_create_result_is_ignored() {
    let (api, mut app, mut events) = app_with(FakeApi::default().gated_creates(), signed_in());
    app.mount();
    app::settle(&mut app, &mut events).await;

    app.handle(Event::Ui(UiEvent::Input("🦀".to_string())));
    app.handle(Event::Ui(UiEvent::KeyDown(Key::Enter)));
    app.handle(Event::PostCreated {
        id: 99,
        result: Ok(fixtures::post("old", "🦀")),
    });
    tokio::task::yield_now().await;

    assert!(app.composer().is_posting());
    assert_eq!(app.composer().input(), "🦀");
    assert_eq!(api.get_calls(), 1);

    api.release_creates(1);
    app::settle(&mut app, &mut events).await;
    assert!(!app.composer().is_posting());
    assert_eq!(app.composer().input(), "");
    assert_eq!(api.get_calls(), 2);
}

struct FailingIdentity;

impl Identity for FailingIdentity {
    async fn load(&self) -> Result<SessionState, ApiError> {
        Err(ApiError::Status(503))
    }
}

#[tokio::test]
async fn identity_failure_still_loads_page() {
    let (tx, mut events) = mpsc::unbounded_channel();
    let mut app = App::new(
        Arc::new(FakeApi::default()),
        Arc::new(FailingIdentity),
        "/sign-in",
        tx,
    );
    app.mount();
    app::settle(&mut app, &mut events).await;

    assert_eq!(app.session(), &SessionState::signed_out());
    let view = app.view(chrono::Utc::now());
    assert_eq!(view.components("sign-in").len(), 1);
    assert_eq!(view.components("feed").len(), 1);
}
