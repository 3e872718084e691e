use chrono::{DateTime, Utc};

use crate::{
    model::PostWithAuthor,
    time::from_now,
    view::{el, Node},
};

pub fn profile_href(username: &str) -> String {
    format!("/@{}", username)
}

pub fn permalink_href(post_id: &str) -> String {
    format!("/post/{}", post_id)
}

/// One post with its author. Pure: the same pairing and clock give the same tree.
pub fn post_view(item: &PostWithAuthor, now: DateTime<Utc>) -> Node {
    let PostWithAuthor { post, author } = item;

    let avatar = el("img")
        .attr("src", author.profile_image_url.as_str())
        .attr("alt", format!("@{}'s profile picture", author.username))
        .attr("width", "50")
        .attr("height", "50")
        .class("rounded-full");
    let byline = el("div")
        .class("flex items-center text-slate-300")
        .child(
            el("a")
                .attr("href", profile_href(&author.username))
                .child(format!("@{}", author.username)),
        )
        .child(" · ")
        .child(
            el("a")
                .attr("href", permalink_href(&post.id))
                .class("font-thin")
                .child(from_now(post.created_at, now)),
        );

    el("div")
        .component("post-view")
        .attr("data-key", item.id())
        .class("flex justify-start gap-3 border-b border-slate-400 p-8")
        .child(avatar)
        .child(
            el("div")
                .class("flex flex-col")
                .child(byline)
                .child(el("span").class("text-xl").child(post.content.as_str())),
        )
        .into()
}
