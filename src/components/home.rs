use chrono::{DateTime, Utc};

use crate::{
    cache::{QueryKey, QueryState},
    identity::SessionState,
    view::{el, Node},
};

use super::{CreatePostWizard, Effect, Feed, WizardMsg};

pub fn page_layout(children: impl IntoIterator<Item = Node>) -> Node {
    el("main")
        .class("flex h-screen justify-center")
        .child(
            el("div")
                .class("h-full w-full overflow-y-scroll border-x border-slate-400 md:max-w-2xl")
                .children(children),
        )
        .into()
}

fn sign_in_button(href: &str) -> Node {
    el("a")
        .component("sign-in")
        .attr("href", href)
        .child("Sign in")
        .into()
}

/// The home page: composer for signed-in users above the feed.
#[derive(Debug)]
pub struct Home {
    wizard: CreatePostWizard,
    feed: Feed,
    feed_mounted: bool,
    sign_in_url: String,
}

impl Home {
    pub fn new(sign_in_url: impl Into<String>) -> Self {
        Self {
            wizard: CreatePostWizard::default(),
            feed: Feed,
            feed_mounted: false,
            sign_in_url: sign_in_url.into(),
        }
    }

    pub fn wizard(&self) -> &CreatePostWizard {
        &self.wizard
    }

    /// Start reading the feed before the session is known, so it is warm
    /// by the time the feed mounts.
    pub fn mount(&mut self) -> Vec<Effect> {
        vec![Effect::Fetch(QueryKey::PostsGetAll)]
    }

    pub fn session_changed(
        &mut self,
        previous: &SessionState,
        session: &SessionState,
    ) -> Vec<Effect> {
        let mut effects = vec![];
        if session.is_loaded && !self.feed_mounted {
            self.feed_mounted = true;
            effects.extend(self.feed.mount());
        }
        if previous.is_signed_in && !session.is_signed_in {
            effects.extend(self.wizard.unmount());
        }
        effects
    }

    /// Route a composer message; the composer only exists while signed in.
    pub fn update_wizard(&mut self, session: &SessionState, msg: WizardMsg) -> Vec<Effect> {
        if !(session.is_loaded && session.is_signed_in) {
            return vec![];
        }
        self.wizard.update(msg)
    }

    pub fn view(&self, session: &SessionState, posts: &QueryState, now: DateTime<Utc>) -> Node {
        if !session.is_loaded {
            return el("div").into();
        }

        let header = el("div")
            .class("flex border-b border-slate-400 p-4")
            .child(
                el("div")
                    .class("flex justify-center")
                    .child((!session.is_signed_in).then(|| sign_in_button(&self.sign_in_url))),
            )
            .child(
                session
                    .is_signed_in
                    .then(|| self.wizard.view(session.user.as_ref())),
            );

        page_layout([header.into(), self.feed.view(posts, now)])
    }
}
