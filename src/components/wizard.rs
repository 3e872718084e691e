use log::{debug, info};

use crate::{
    api::ApiError,
    cache::QueryKey,
    identity::CurrentUser,
    model::{CreatePost, Post},
    view::{el, Node},
};

use super::{loading_spinner, Effect};

pub const GENERIC_ERROR: &str = "Something went wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other,
}

#[derive(Debug)]
pub enum WizardMsg {
    Input(String),
    KeyDown(Key),
    ClickPost,
    Created(Result<Post, ApiError>),
}

/// Composer for a new post, shown to signed-in users.
#[derive(Debug, Default)]
pub struct CreatePostWizard {
    input: String,
    is_posting: bool,
}

impl CreatePostWizard {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub const fn is_posting(&self) -> bool {
        self.is_posting
    }

    fn shows_button(&self) -> bool {
        !self.input().is_empty() && !self.is_posting()
    }

    pub fn update(&mut self, msg: WizardMsg) -> Vec<Effect> {
        match msg {
            WizardMsg::Input(text) => {
                // the field is disabled while posting
                if !self.is_posting {
                    self.input = text;
                }
                vec![]
            }
            WizardMsg::KeyDown(Key::Enter) | WizardMsg::ClickPost => {
                self.submit().into_iter().collect()
            }
            WizardMsg::KeyDown(Key::Other) => vec![],
            WizardMsg::Created(Ok(post)) => {
                info!("Posted {}", post.id);
                self.is_posting = false;
                self.input.clear();
                vec![Effect::Invalidate(QueryKey::PostsGetAll)]
            }
            WizardMsg::Created(Err(e)) => {
                debug!("Create failed: {:?}", e);
                self.is_posting = false;
                vec![Effect::Toast(error_message(&e))]
            }
        }
    }

    fn submit(&mut self) -> Option<Effect> {
        if self.input.trim().is_empty() || self.is_posting {
            return None;
        }
        self.is_posting = true;
        Some(Effect::CreatePost(CreatePost {
            content: self.input.clone(),
        }))
    }

    /// Reset local state when the wizard leaves the page.
    pub fn unmount(&mut self) -> Vec<Effect> {
        let effects = if self.is_posting {
            vec![Effect::CancelCreate]
        } else {
            vec![]
        };
        *self = Self::default();
        effects
    }

    pub fn view(&self, user: Option<&CurrentUser>) -> Node {
        let Some(user) = user else {
            return Node::Empty;
        };

        let avatar = el("img")
            .attr("src", user.profile_image_url.as_str())
            .attr("alt", "Profile Image")
            .attr("width", "56")
            .attr("height", "56")
            .class("rounded-full");
        let input = el("input")
            .attr("placeholder", "Type some emojis!")
            .class("grow bg-transparent outline-none")
            .attr("type", "text")
            .attr("value", self.input.as_str())
            .flag("disabled", self.is_posting);
        let button = self.shows_button().then(|| {
            el("button")
                .class("rounded-md bg-blue-500 px-4 py-2 text-white disabled:cursor-not-allowed disabled:opacity-50")
                .flag("disabled", self.is_posting)
                .child("Post")
        });
        let spinner = self
            .is_posting
            .then(|| el("div").class("w-[2rem]").child(loading_spinner()));

        el("div")
            .component("create-post-wizard")
            .class("flex w-full items-center gap-3")
            .child(avatar)
            .child(input)
            .child(button)
            .child(spinner)
            .into()
    }
}

/// Text of the notification shown for a failed create.
pub fn error_message(error: &ApiError) -> String {
    error
        .field_errors("content")
        .and_then(|messages| messages.first())
        .filter(|message| !message.is_empty())
        .cloned()
        .unwrap_or_else(|| GENERIC_ERROR.to_string())
}
