pub mod feed;
pub mod home;
pub mod post_view;
pub mod wizard;

use crate::{
    cache::QueryKey,
    model::CreatePost,
    view::{el, Node},
};

pub use feed::Feed;
pub use home::Home;
pub use post_view::post_view;
pub use wizard::{CreatePostWizard, Key, WizardMsg};

/// Side effects a component asks the page runtime to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreatePost(CreatePost),
    /// Abort an in-flight create; its result must not reach the wizard.
    CancelCreate,
    Fetch(QueryKey),
    Invalidate(QueryKey),
    Toast(String),
}

pub fn loading_spinner() -> Node {
    el("div")
        .component("loading-spinner")
        .attr("role", "status")
        .child(el("span").class("sr-only").child("Loading..."))
        .into()
}

pub fn loading_page() -> Node {
    el("div")
        .class("absolute top-0 right-0 flex h-screen w-screen items-center justify-center")
        .child(loading_spinner())
        .into()
}
