use serde::Serialize;

/// Returned for an absent handle.
pub const PLACEHOLDER_LINK: &str = "#";

/// External networks a profile can link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Github,
    Qiita,
    X,
}

impl Network {
    pub const ALL: [Network; 3] = [Network::Github, Network::Qiita, Network::X];

    pub fn host(self) -> &'static str {
        match self {
            Network::Github => "github.com",
            Network::Qiita => "qiita.com",
            Network::X => "twitter.com",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Network::Github => "GitHub",
            Network::Qiita => "Qiita",
            Network::X => "X (Twitter)",
        }
    }
}

/// Canonical profile URL for `handle` on `network`, or `"#"` without a handle.
pub fn create_profile_link(network: Network, handle: Option<&str>) -> String {
    match handle {
        Some(handle) if !handle.is_empty() => format!("https://{}/{}", network.host(), handle),
        _ => PLACEHOLDER_LINK.to_string(),
    }
}
