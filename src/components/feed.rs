use chrono::{DateTime, Utc};

use crate::{
    cache::{QueryKey, QueryState},
    view::{el, Node},
};

use super::{loading_page, post_view, wizard::GENERIC_ERROR, Effect};

pub const EMPTY_FEED: &str = "No posts yet";

/// Every post, newest first as the server orders them.
#[derive(Debug, Default)]
pub struct Feed;

impl Feed {
    pub fn mount(&self) -> Vec<Effect> {
        vec![Effect::Fetch(QueryKey::PostsGetAll)]
    }

    pub fn view(&self, posts: &QueryState, now: DateTime<Utc>) -> Node {
        match posts {
            QueryState::Loading => loading_page(),
            QueryState::Failed(_) => el("div")
                .component("feed-error")
                .child(GENERIC_ERROR)
                .into(),
            QueryState::Ready(posts) if posts.is_empty() => el("div")
                .component("feed")
                .class("flex flex-col")
                .child(el("div").class("p-8 text-slate-400").child(EMPTY_FEED))
                .into(),
            QueryState::Ready(posts) => el("div")
                .component("feed")
                .class("flex flex-col")
                .children(posts.iter().map(|item| post_view(item, now)))
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test::fixtures::post_with_author;

    #[test]
    fn loading_shows_only_spinner() {
        let view = Feed.view(&QueryState::Loading, Utc::now());
        assert_eq!(view.components("loading-spinner").len(), 1);
        assert!(view.components("feed").is_empty());
        assert!(view.components("post-view").is_empty());
    }

    #[test]
    fn failure_shows_generic_message() {
        let view = Feed.view(&QueryState::Failed("boom".to_string()), Utc::now());
        assert_eq!(view.text(), "Something went wrong");
        assert!(view.components("post-view").is_empty());
    }

    #[test]
    fn empty_list_is_not_an_error() {
        let view = Feed.view(&QueryState::Ready(Arc::new(vec![])), Utc::now());
        assert_eq!(view.components("feed").len(), 1);
        assert_eq!(view.text(), "No posts yet");
    }

    #[test]
    fn renders_one_view_per_pairing_in_order() {
        let posts = vec![
            post_with_author("c", "ferris", "third"),
            post_with_author("a", "corro", "first"),
            post_with_author("b", "ferris", "second"),
        ];
        let now = posts[0].post.created_at;
        let view = Feed.view(&QueryState::Ready(Arc::new(posts)), now);

        let rendered = view.components("post-view");
        let keys: Vec<_> = rendered.iter().filter_map(|e| e.get("data-key")).collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
        assert!(rendered[1].text().contains("@corro"));
        assert!(rendered[1].text().ends_with("first"));
    }

    #[test]
    fn mount_reads_posts() {
        assert_eq!(Feed.mount(), vec![Effect::Fetch(QueryKey::PostsGetAll)]);
    }
}
