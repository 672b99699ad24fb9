//! Scraping of the login handshake pages.
//!
//! Both functions are pure over the page markup:
//! - the login page carries a one-time `form_build_id` in a hidden input
//!   of `form#user-login`;
//! - the landing page after a successful login links to
//!   `/user/<id>/bot-activity` from its primary navigation tabs.

use std::sync::LazyLock;

use regex::Regex;
use rosbot_shared::{Result, RosbotError};
use scraper::{Html, Selector};

/// Name of the hidden input holding the anti-forgery token.
const TOKEN_FIELD: &str = "form_build_id";

static LOGIN_HIDDEN_INPUT_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("form#user-login input[type=hidden]").expect("login form selector")
});

static PRIMARY_TAB_LINK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul.tabs--primary.nav.nav-tabs a[href]").expect("primary tabs selector")
});

/// Matches the numeric user-activity path.
static ACTIVITY_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/user/\d+/bot-activity").expect("activity path regex")
});

/// Extract the `form_build_id` token from the login page.
pub fn extract_form_build_id(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);

    doc.select(&LOGIN_HIDDEN_INPUT_SEL)
        .find(|el| el.value().attr("name") == Some(TOKEN_FIELD))
        .and_then(|el| el.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(RosbotError::MissingLoginToken)
}

/// Extract the bot-activity path from the landing page's primary tabs.
///
/// The first matching link wins; the href is returned verbatim.
pub fn extract_activity_endpoint(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);

    doc.select(&PRIMARY_TAB_LINK_SEL)
        .filter_map(|el| el.value().attr("href"))
        .find(|href| ACTIVITY_PATH_RE.is_match(href))
        .map(str::to_string)
        .ok_or(RosbotError::MissingActivityEndpoint)
}
