use std::{error::Error, io::Write, sync::Arc};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    task::AbortHandle,
};

use crate::{
    api::{ApiError, PostsApi},
    cache::{QueryCache, QueryKey},
    components::{CreatePostWizard, Effect, Home, Key, WizardMsg},
    config::OutputFormat,
    identity::{Identity, SessionState},
    model::{CreatePost, Post},
    toast::Toaster,
    view::{el, Node},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Input(String),
    KeyDown(Key),
    ClickPost,
}

#[derive(Debug)]
pub enum Event {
    Ui(UiEvent),
    SessionLoaded(SessionState),
    QuerySettled(QueryKey),
    PostCreated {
        id: u64,
        result: Result<Post, ApiError>,
    },
}

/// Hosts the home page: owns its state and runs the effects it asks for.
/// Network work runs in spawned tasks that report back through `events`.
pub struct App<A: PostsApi, I: Identity> {
    api: Arc<A>,
    identity: Arc<I>,
    cache: Arc<QueryCache<A>>,
    session: SessionState,
    home: Home,
    toaster: Toaster,
    events: UnboundedSender<Event>,
    pending_reads: usize,
    create: Option<(u64, AbortHandle)>,
    next_create: u64,
}

impl<A: PostsApi, I: Identity> App<A, I> {
    pub fn new(
        api: Arc<A>,
        identity: Arc<I>,
        sign_in_url: impl Into<String>,
        events: UnboundedSender<Event>,
    ) -> Self {
        Self {
            cache: Arc::new(QueryCache::new(api.clone())),
            api,
            identity,
            session: SessionState::default(),
            home: Home::new(sign_in_url),
            toaster: Toaster::default(),
            events,
            pending_reads: 0,
            create: None,
            next_create: 0,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn composer(&self) -> &CreatePostWizard {
        self.home.wizard()
    }

    pub fn mount(&mut self) {
        let effects = self.home.mount();
        self.apply(effects);

        let identity = self.identity.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let session = identity.load().await.unwrap_or_else(|e| {
                warn!("Failed to load session: {}", e);
                SessionState::signed_out()
            });
            let _ = events.send(Event::SessionLoaded(session));
        });
    }

    pub fn handle(&mut self, event: Event) {
        let effects = match event {
            Event::Ui(ui) => {
                let msg = match ui {
                    UiEvent::Input(text) => WizardMsg::Input(text),
                    UiEvent::KeyDown(key) => WizardMsg::KeyDown(key),
                    UiEvent::ClickPost => WizardMsg::ClickPost,
                };
                self.home.update_wizard(&self.session, msg)
            }
            Event::SessionLoaded(session) => {
                let previous = std::mem::replace(&mut self.session, session);
                self.home.session_changed(&previous, &self.session)
            }
            Event::QuerySettled(key) => {
                debug!("{} settled", key);
                self.pending_reads = self.pending_reads.saturating_sub(1);
                vec![]
            }
            Event::PostCreated { id, result } => {
                if self.create.as_ref().map(|(current, _)| *current) != Some(id) {
                    debug!("Ignoring result of cancelled create #{}", id);
                    vec![]
                } else {
                    self.create = None;
                    self.home
                        .update_wizard(&self.session, WizardMsg::Created(result))
                }
            }
        };
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreatePost(input) => self.spawn_create(input),
                Effect::CancelCreate => {
                    if let Some((id, handle)) = self.create.take() {
                        info!("Cancelling create #{}", id);
                        handle.abort();
                    }
                }
                Effect::Fetch(key) => self.spawn_read(key),
                Effect::Invalidate(key) => {
                    // the feed is mounted whenever the composer is, so refetch now
                    self.cache.invalidate(key);
                    self.spawn_read(key);
                }
                Effect::Toast(message) => {
                    self.toaster.error(message, Utc::now());
                }
            }
        }
    }

    fn spawn_read(&mut self, key: QueryKey) {
        self.pending_reads += 1;
        let cache = self.cache.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            cache.read(key).await;
            let _ = events.send(Event::QuerySettled(key));
        });
    }

    fn spawn_create(&mut self, input: CreatePost) {
        self.next_create += 1;
        let id = self.next_create;
        debug!("Creating post #{}", id);

        let api = self.api.clone();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let result = api.create(input).await;
            let _ = events.send(Event::PostCreated { id, result });
        });
        self.create = Some((id, task.abort_handle()));
    }

    /// No request outstanding and the session known.
    pub fn is_settled(&self) -> bool {
        self.session.is_loaded && self.pending_reads == 0 && self.create.is_none()
    }

    pub fn view(&self, now: DateTime<Utc>) -> Node {
        let posts = self.cache.state(QueryKey::PostsGetAll);
        let toasts = self.toaster.visible(now).map(|toast| {
            Node::from(
                el("div")
                    .class("toast toast-error")
                    .attr("role", "status")
                    .attr("data-key", toast.id.to_string())
                    .child(toast.message.as_str()),
            )
        });

        el("div")
            .component("app")
            .child(self.home.view(&self.session, &posts, now))
            .child(el("div").component("toaster").children(toasts))
            .into()
    }

    /// Print the current frame.
    pub fn render(
        &mut self,
        out: &mut impl Write,
        format: OutputFormat,
    ) -> Result<(), Box<dyn Error>> {
        let now = Utc::now();
        self.toaster.prune(now);
        let view = self.view(now);
        let frame = match format {
            OutputFormat::Html => view.to_html(),
            OutputFormat::Markdown => view.to_markdown()?,
        };
        writeln!(out, "{}", frame)?;
        writeln!(out, "---")?;
        out.flush()?;
        Ok(())
    }
}

/// Handle events until nothing is in flight.
pub async fn settle<A: PostsApi, I: Identity>(
    app: &mut App<A, I>,
    events: &mut UnboundedReceiver<Event>,
) {
    while !app.is_settled() {
        match events.recv().await {
            Some(event) => app.handle(event),
            None => break,
        }
    }
}

/// Load the page once and print it.
pub async fn render_once<A: PostsApi, I: Identity>(
    mut app: App<A, I>,
    mut events: UnboundedReceiver<Event>,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    app.mount();
    settle(&mut app, &mut events).await;
    app.render(out, format)
}

/// Type `content` into the composer, press Enter, and print the refreshed page.
pub async fn post_once<A: PostsApi, I: Identity>(
    mut app: App<A, I>,
    mut events: UnboundedReceiver<Event>,
    content: String,
    out: &mut impl Write,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    app.mount();
    settle(&mut app, &mut events).await;
    if !app.session().is_signed_in {
        return Err("sign in to post (set SESSION and IDENTITY_URL)".into());
    }

    app.handle(Event::Ui(UiEvent::Input(content)));
    app.handle(Event::Ui(UiEvent::KeyDown(Key::Enter)));
    settle(&mut app, &mut events).await;
    app.render(out, format)?;

    // a successful create clears the composer
    if !app.composer().input().is_empty() {
        return Err("post was not accepted".into());
    }
    Ok(())
}
