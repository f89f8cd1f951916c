use meishi_database::{ProfileRecord, SharedDatastore, Skill};
use serde::Serialize;

use crate::links::{create_profile_link, Network};
use crate::query::{QueryCache, QueryKey, QueryOptions, QueryState};

pub const PROFILE_QUERY: &str = "user";
pub const PROFILES_QUERY: &str = "users";
pub const SKILLS_QUERY: &str = "skills";

/// Cached profile and skill reads shared by every request.
pub struct ProfileQueries {
    store: SharedDatastore,
    profile: QueryCache<ProfileRecord>,
    profiles: QueryCache<Vec<ProfileRecord>>,
    skills: QueryCache<Vec<Skill>>,
}

impl ProfileQueries {
    pub fn new(store: SharedDatastore, options: QueryOptions) -> Self {
        Self {
            store,
            profile: QueryCache::new(options),
            profiles: QueryCache::new(options),
            skills: QueryCache::new(options),
        }
    }

    /// Disabled (`Idle`) unless `user_id` is present and non-blank.
    pub async fn profile_by_id(&self, user_id: Option<&str>) -> QueryState<ProfileRecord> {
        let store = &self.store;
        self.profile
            .fetch_by_id(PROFILE_QUERY, user_id, |id| async move {
                store.fetch_profile_by_id(&id).await
            })
            .await
    }

    pub async fn all_profiles(&self) -> QueryState<Vec<ProfileRecord>> {
        let store = &self.store;
        self.profiles
            .fetch(QueryKey::new(PROFILES_QUERY), || async move {
                store.fetch_all_profiles().await
            })
            .await
    }

    pub async fn skills(&self) -> QueryState<Vec<Skill>> {
        let store = &self.store;
        self.skills
            .fetch(QueryKey::new(SKILLS_QUERY), || async move { store.fetch_skills().await })
            .await
    }

    pub async fn card(&self, user_id: Option<&str>) -> CardView {
        CardView::from_state(self.profile_by_id(user_id).await)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocialLink {
    pub network: Network,
    pub label: &'static str,
    pub url: String,
}

/// A profile as shown on the card page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub user_id: String,
    pub name: String,
    /// Stored markup; the renderer decides whether it is escaped.
    pub bio: String,
    /// Comma-separated skill names, absent when no skill is attached.
    pub skills: Option<String>,
    /// Only networks with a handle get a link.
    pub links: Vec<SocialLink>,
}

impl From<ProfileRecord> for Card {
    fn from(record: ProfileRecord) -> Self {
        let names: Vec<&str> = record.skills().map(|skill| skill.name.as_str()).collect();
        let skills = (!names.is_empty()).then(|| names.join(", "));

        let links = Network::ALL
            .into_iter()
            .filter_map(|network| {
                let handle = match network {
                    Network::Github => record.github_id.as_deref(),
                    Network::Qiita => record.qiita_id.as_deref(),
                    Network::X => record.x_id.as_deref(),
                }
                .filter(|handle| !handle.is_empty())?;
                Some(SocialLink {
                    network,
                    label: network.label(),
                    url: create_profile_link(network, Some(handle)),
                })
            })
            .collect();

        Self {
            user_id: record.user_id,
            name: record.name,
            bio: record.description,
            skills,
            links,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CardView {
    /// Shown while loading, on failure, or when the profile does not exist.
    Placeholder,
    Card(Card),
}

impl CardView {
    pub fn from_state(state: QueryState<ProfileRecord>) -> Self {
        match state {
            QueryState::Ready(record) => CardView::Card(record.into()),
            _ => CardView::Placeholder,
        }
    }
}
