// VK API client: a small blocking HTTP client for the handful of VK methods
// the backup needs. Every call carries the caller's access token and the
// pinned API version as query parameters.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{Error, Result};
use crate::pipeline::PhotoSource;

pub const DEFAULT_BASE_URL: &str = "https://api.vk.com/method";
pub const API_VERSION: &str = "5.199";

/// `photos.get` never returns more than this many items per call.
const MAX_PHOTOS_PER_CALL: u32 = 1000;

/// Which photo collection to back up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumKind {
    Profile,
    Wall,
    Album(i64),
}

impl AlbumKind {
    fn as_param(&self) -> String {
        match self {
            AlbumKind::Profile => "profile".into(),
            AlbumKind::Wall => "wall".into(),
            AlbumKind::Album(id) => id.to_string(),
        }
    }
}

impl FromStr for AlbumKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "profile" => Ok(AlbumKind::Profile),
            "wall" => Ok(AlbumKind::Wall),
            other => other.parse::<i64>().map(AlbumKind::Album).map_err(|_| {
                format!(
                    "unknown collection '{}': expected profile, wall or a numeric album id",
                    other
                )
            }),
        }
    }
}

impl fmt::Display for AlbumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_param())
    }
}

/// One rendition of a photo.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Size {
    #[serde(rename = "type")]
    pub type_: String,
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Likes {
    pub count: u64,
}

/// A `photos.get` item, as returned with `extended=1`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhotoRecord {
    pub id: i64,
    #[serde(default)]
    pub owner_id: i64,
    pub date: i64,
    pub likes: Likes,
    pub sizes: Vec<Size>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Deserialize)]
struct ItemList<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiErrorBody>,
}

/// Decode a VK response body: either `{response: ...}` or `{error: ...}`.
pub(crate) fn parse_envelope<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|source| Error::Shape {
        endpoint: endpoint.to_string(),
        source,
    })?;

    match envelope {
        Envelope {
            error: Some(err), ..
        } => Err(Error::VkApi {
            code: err.error_code,
            message: err.error_msg,
        }),
        Envelope {
            response: Some(response),
            ..
        } => Ok(response),
        _ => Err(Error::Shape {
            endpoint: endpoint.to_string(),
            source: <serde_json::Error as serde::de::Error>::custom(
                "neither `response` nor `error` present",
            ),
        }),
    }
}

/// Blocking VK client bound to one user and one collection.
#[derive(Clone)]
pub struct VkClient {
    client: Client,
    base_url: String,
    token: String,
    user_id: String,
    owner_id: String,
    album: AlbumKind,
}

impl fmt::Debug for VkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VkClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("owner_id", &self.owner_id)
            .field("album", &self.album)
            .finish()
    }
}

impl VkClient {
    pub fn new(
        base_url: &str,
        token: &str,
        user_id: &str,
        album: AlbumKind,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(VkClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            user_id: user_id.to_string(),
            owner_id: user_id.to_string(),
            album,
        })
    }

    fn base_params(&self) -> [(&'static str, &str); 2] {
        [("access_token", self.token.as_str()), ("v", API_VERSION)]
    }

    fn call<T: DeserializeOwned>(&self, method: &str, params: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        tracing::debug!("VK call: {}", method);
        let res = self
            .client
            .get(&url)
            .query(&self.base_params())
            .query(params)
            .send()?
            .error_for_status()?;
        let body = res.text()?;
        parse_envelope(method, &body)
    }

    /// Resolve the owner of the backed-up collection.
    pub fn users_info(&self) -> Result<Option<User>> {
        let users: Vec<User> = self.call("users.get", &[("user_ids", self.user_id.clone())])?;
        Ok(users.into_iter().next())
    }

    /// Look the user up and use their numeric id for photo calls, so
    /// screen names like `durov` work with `photos.get` too.
    pub fn resolve_owner(&mut self) -> Result<Option<User>> {
        let user = self.users_info()?;
        if let Some(user) = &user {
            self.owner_id = user.id.to_string();
        }
        Ok(user)
    }

    pub fn status(&self) -> Result<Status> {
        self.call("status.get", &[("user_id", self.user_id.clone())])
    }

    pub fn albums(&self) -> Result<Vec<Album>> {
        let list: ItemList<Album> = self.call(
            "photos.getAlbums",
            &[
                ("owner_id", self.owner_id.clone()),
                ("need_system", "1".into()),
            ],
        )?;
        Ok(list.items)
    }

    pub fn photos(&self) -> Result<Vec<PhotoRecord>> {
        let list: ItemList<PhotoRecord> = self.call(
            "photos.get",
            &[
                ("owner_id", self.owner_id.clone()),
                ("album_id", self.album.as_param()),
                ("extended", "1".into()),
                // newest first, so the cap keeps the most recent photos
                ("rev", "1".into()),
                ("count", MAX_PHOTOS_PER_CALL.to_string()),
            ],
        )?;
        tracing::info!(
            "Fetched {} photo(s) from the {} collection",
            list.items.len(),
            self.album
        );
        Ok(list.items)
    }
}

impl PhotoSource for VkClient {
    fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        self.photos()
    }

    fn fetch_content(&self, url: &str) -> Result<Vec<u8>> {
        let res = self
            .client
            .get(url)
            .query(&self.base_params())
            .send()?
            .error_for_status()?;
        Ok(res.bytes()?.to_vec())
    }
}
