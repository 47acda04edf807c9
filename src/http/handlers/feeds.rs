//! RSS/Atom syndication feeds.
//!
//! The site feed lists the latest projects; each project additionally
//! exposes a feed of its components. The `kind` path segment selects the
//! serialization.

use atom_syndication::{EntryBuilder, FeedBuilder, LinkBuilder, Text};
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use rss::{ChannelBuilder, ItemBuilder};

use crate::http::error::AppError;
use crate::http::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feed/{kind}", get(site_feed))
        .route("/projects/{project_slug}/feed/{kind}", get(project_feed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

impl FeedKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind {
            "rss" => Some(FeedKind::Rss),
            "atom" => Some(FeedKind::Atom),
            _ => None,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            FeedKind::Rss => "application/rss+xml; charset=UTF-8",
            FeedKind::Atom => "application/atom+xml; charset=UTF-8",
        }
    }
}

/// One feed item, independent of the serialization.
struct FeedItem {
    title: String,
    url: String,
    description: String,
    date: DateTime<Utc>,
}

fn absolute_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

async fn site_feed(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Response, AppError> {
    let kind = FeedKind::parse(&kind).ok_or(AppError::NotFound)?;
    let base = state.config.feeds.base_url.clone();
    let limit = state.config.feeds.item_limit;

    let items: Vec<FeedItem> = state
        .store
        .list_projects()
        .await?
        .into_iter()
        .filter(|p| p.enabled)
        .take(limit)
        .map(|p| FeedItem {
            url: absolute_url(&base, &format!("/projects/{}", p.slug)),
            title: p.name,
            description: p.description,
            date: p.created_at,
        })
        .collect();

    Ok(render(
        kind,
        "Latest projects",
        "Latest translation projects on this hub.",
        &absolute_url(&base, "/projects"),
        items,
    ))
}

async fn project_feed(
    State(state): State<AppState>,
    Path((slug, kind)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let kind = FeedKind::parse(&kind).ok_or(AppError::NotFound)?;
    let project = super::project_or_404(&state, &slug).await?;
    let base = state.config.feeds.base_url.clone();
    let limit = state.config.feeds.item_limit;

    let items: Vec<FeedItem> = state
        .store
        .list_components(project.id)
        .await?
        .into_iter()
        .take(limit)
        .map(|c| FeedItem {
            url: absolute_url(
                &base,
                &format!("/projects/{}/components/{}", project.slug, c.slug),
            ),
            title: c.full_name(&project.slug),
            description: c.description,
            date: c.created_at,
        })
        .collect();

    Ok(render(
        kind,
        &format!("Components of {}", project.name),
        &project.description,
        &absolute_url(&base, &format!("/projects/{}", project.slug)),
        items,
    ))
}

fn render(kind: FeedKind, title: &str, description: &str, link: &str, items: Vec<FeedItem>) -> Response {
    let body = match kind {
        FeedKind::Rss => render_rss(title, description, link, items),
        FeedKind::Atom => render_atom(title, description, link, items),
    };
    ([(header::CONTENT_TYPE, kind.content_type())], body).into_response()
}

fn render_rss(title: &str, description: &str, link: &str, items: Vec<FeedItem>) -> String {
    let items: Vec<rss::Item> = items
        .into_iter()
        .map(|item| {
            ItemBuilder::default()
                .title(Some(item.title))
                .link(Some(item.url))
                .description(Some(item.description))
                .pub_date(Some(item.date.to_rfc2822()))
                .build()
        })
        .collect();

    ChannelBuilder::default()
        .title(title.to_string())
        .link(link.to_string())
        .description(description.to_string())
        .items(items)
        .build()
        .to_string()
}

fn render_atom(title: &str, description: &str, link: &str, items: Vec<FeedItem>) -> String {
    let updated = items
        .iter()
        .map(|item| item.date)
        .max()
        .unwrap_or_else(Utc::now);

    let entries: Vec<atom_syndication::Entry> = items
        .into_iter()
        .map(|item| {
            EntryBuilder::default()
                .title(Text::plain(item.title))
                .id(item.url.clone())
                .updated(item.date.fixed_offset())
                .links(vec![LinkBuilder::default().href(item.url).build()])
                .summary(Some(Text::plain(item.description)))
                .build()
        })
        .collect();

    FeedBuilder::default()
        .title(Text::plain(title))
        .subtitle(Some(Text::plain(description)))
        .id(link.to_string())
        .updated(updated.fixed_offset())
        .links(vec![LinkBuilder::default().href(link.to_string()).build()])
        .entries(entries)
        .build()
        .to_string()
}
