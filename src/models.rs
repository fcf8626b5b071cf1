use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend-assigned identity. The API hands out both numeric and string ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl EntityId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => EntityId::Number(n),
            Err(_) => EntityId::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: EntityId,
    pub title: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub year: Option<i32>,
    /// Comma separated. Lists coming from the backend are joined on read.
    #[serde(default, deserialize_with = "genres_text")]
    pub genres: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default, alias = "poster_url", alias = "poster")]
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default, alias = "is_admin")]
    pub is_admin: bool,
    #[serde(default = "default_true", alias = "is_active")]
    pub is_active: bool,
    #[serde(default, alias = "join_date", alias = "createdAt")]
    pub join_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "is_admin")]
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_movies: u64,
    pub total_users: u64,
    pub total_quizzes: u64,
    pub active_users: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentQuiz {
    #[serde(alias = "user", alias = "username")]
    pub user_name: Option<String>,
    #[serde(deserialize_with = "genres_list")]
    pub genres: Vec<String>,
    #[serde(alias = "recommendationCount")]
    pub recommendations: Option<u32>,
    #[serde(alias = "timestamp", alias = "created_at")]
    pub created_at: Option<String>,
}

/// Read-only aggregate, fetched fresh on every analytics view.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizAnalytics {
    pub total_quizzes: u64,
    pub unique_users: u64,
    pub avg_per_user: f64,
    pub top_genres: Vec<GenreCount>,
    pub recent_quizzes: Vec<RecentQuiz>,
}

/// One page of a listing plus whatever pagination the backend reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ListPage<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Envelope<T> {
            Bare(Vec<T>),
            Paged {
                #[serde(alias = "movies", alias = "users")]
                items: Vec<T>,
                #[serde(default)]
                page: Option<u32>,
                #[serde(default, alias = "totalPages", alias = "pages")]
                total_pages: Option<u32>,
                #[serde(default)]
                total: Option<u64>,
            },
        }

        Ok(match Envelope::<T>::deserialize(deserializer)? {
            Envelope::Bare(items) => ListPage {
                total: items.len() as u64,
                items,
                page: 1,
                total_pages: 1,
            },
            Envelope::Paged {
                items,
                page,
                total_pages,
                total,
            } => ListPage {
                total: total.unwrap_or(items.len() as u64),
                items,
                page: page.unwrap_or(1).max(1),
                total_pages: total_pages.unwrap_or(1).max(1),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub genres: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub director: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
}

/// Email is deliberately absent: it cannot be changed from the console.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub name: String,
    pub is_admin: bool,
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

fn genres_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<TextOrList>::deserialize(deserializer)? {
        Some(TextOrList::Text(s)) => s,
        Some(TextOrList::List(list)) => list.join(", "),
        None => String::new(),
    })
}

/// Numbers arrive as JSON numbers or, for bulk-imported rows, as strings.
/// Anything unreadable becomes `None` instead of failing the whole list.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn genres_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<TextOrList>::deserialize(deserializer)? {
        Some(TextOrList::Text(s)) => s
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect(),
        Some(TextOrList::List(list)) => list,
        None => Vec::new(),
    })
}
