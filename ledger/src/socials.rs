use tracing::warn;

use crate::{
    constants::{IMAGE_EXTENSIONS, TWITTER_URL_PREFIX, URL_PREFIX},
    structures::{Attribution, SocialBundle},
};

/// Socials ready to show next to a pixel. Entries that do not look like
/// links are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialLinks {
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub community: Option<String>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub ticker: Option<String>,
    pub description: Option<String>,
}

impl SocialBundle {
    pub fn links(&self) -> SocialLinks {
        SocialLinks {
            website: self.website.as_deref().and_then(|v| url("website", v)),
            twitter: self.twitter.as_deref().and_then(twitter),
            community: self.community.as_deref().and_then(|v| url("community", v)),
            image: self
                .image
                .as_deref()
                .and_then(|v| url("image", v))
                .and_then(image),
            name: self.name.clone(),
            ticker: self.ticker.clone(),
            description: self.description.clone(),
        }
    }
}

impl Attribution {
    /// Base58 token to display, or `None` for the placeholder token.
    pub fn token_label(&self) -> Option<String> {
        self.advertised_token().map(|token| token.to_string())
    }
}

fn url(field: &str, value: &str) -> Option<String> {
    let link = format!("{}{}", URL_PREFIX, value);
    if looks_like_host(value) {
        Some(link)
    } else {
        warn!(field, %link, "dropping invalid url");
        None
    }
}

/// `host.tld` optionally followed by a path, with no scheme of its own.
fn looks_like_host(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) || value.contains("://") {
        return false;
    }

    let host = value.split(['/', '?', '#']).next().unwrap_or_default();
    let labels: Vec<&str> = host.split('.').collect();
    let Some(tld) = labels.last() else {
        return false;
    };

    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn twitter(handle: &str) -> Option<String> {
    let valid = (1..=15).contains(&handle.len())
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Some(format!("{}{}", TWITTER_URL_PREFIX, handle))
    } else {
        warn!(handle, "dropping invalid twitter handle");
        None
    }
}

fn image(link: String) -> Option<String> {
    let extension = link.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    if extension.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str())) {
        Some(link)
    } else {
        warn!(%link, "dropping image without a known extension");
        None
    }
}
