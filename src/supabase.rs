use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::models::{ClassRecord, SavedList, SavedReference, UserId};
use crate::month::DateWindow;
use crate::store::{ClassStore, StoreError, StoreResult};

const CLASS_TABLE: &str = "danceClassStorage";
const REFERENCE_COLUMNS: &str = "user_id,class_id,created_at";

/// PostgREST + auth client for the hosted backend.
#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: Arc<Url>,
    api_key: Arc<str>,
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

impl SupabaseStore {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: Arc::new(base_url),
            api_key: Arc::from(api_key.into()),
        }
    }

    fn endpoint(&self, path: &str) -> StoreResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|err| StoreError::Decode(format!("invalid endpoint {path}: {err}")))
    }

    fn table_url(&self, table: &str) -> StoreResult<Url> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(self.api_key.as_ref())
    }

    async fn checked(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, method: Method, url: Url) -> StoreResult<Vec<T>> {
        debug!(%url, %method, "store request");
        let response = self
            .request(method, url)
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let response = Self::checked(response).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))
    }

    fn reference_url(&self, list: SavedList, user: &UserId) -> StoreResult<Url> {
        let mut url = self.table_url(list.table())?;
        url.query_pairs_mut()
            .append_pair("select", REFERENCE_COLUMNS)
            .append_pair("user_id", &format!("eq.{user}"));
        Ok(url)
    }

    fn single_reference_url(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Url> {
        let mut url = self.reference_url(list, user)?;
        url.query_pairs_mut()
            .append_pair("class_id", &format!("eq.{class_id}"));
        Ok(url)
    }

    fn class_url(&self, window: DateWindow) -> StoreResult<Url> {
        let mut url = self.table_url(CLASS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("date", &format!("gte.{}", window.start.format("%Y-%m-%d")))
            .append_pair("date", &format!("lt.{}", window.end.format("%Y-%m-%d")));
        Ok(url)
    }
}

/// PostgREST `in.(...)` list; every value quoted so commas and parentheses
/// inside ids survive.
fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

#[async_trait]
impl ClassStore for SupabaseStore {
    async fn resolve_user(&self, access_token: &str) -> StoreResult<Option<UserId>> {
        let url = self.endpoint("auth/v1/user")?;
        let response = self
            .client
            .get(url)
            .header("apikey", self.api_key.as_ref())
            .bearer_auth(access_token)
            .send()
            .await?;
        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            warn!("access token rejected by auth provider");
            return Ok(None);
        }
        let user: AuthUser = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(Some(UserId(user.id)))
    }

    async fn list_references(
        &self,
        list: SavedList,
        user: &UserId,
    ) -> StoreResult<Vec<SavedReference>> {
        let url = self.reference_url(list, user)?;
        self.fetch_rows(Method::GET, url).await
    }

    async fn find_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Option<SavedReference>> {
        let mut url = self.single_reference_url(list, user, class_id)?;
        url.query_pairs_mut().append_pair("limit", "1");
        let rows: Vec<SavedReference> = self.fetch_rows(Method::GET, url).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<SavedReference> {
        let mut url = self.table_url(list.table())?;
        url.query_pairs_mut().append_pair("select", REFERENCE_COLUMNS);
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "user_id": user, "class_id": class_id }))
            .send()
            .await?;
        let rows: Vec<SavedReference> = Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("insert returned no row".into()))
    }

    async fn delete_reference(
        &self,
        list: SavedList,
        user: &UserId,
        class_id: &str,
    ) -> StoreResult<Option<SavedReference>> {
        let url = self.single_reference_url(list, user, class_id)?;
        let rows: Vec<SavedReference> = self.fetch_rows(Method::DELETE, url).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_all_references(&self, list: SavedList, user: &UserId) -> StoreResult<usize> {
        let url = self.reference_url(list, user)?;
        let rows: Vec<SavedReference> = self.fetch_rows(Method::DELETE, url).await?;
        Ok(rows.len())
    }

    async fn classes_by_ids(
        &self,
        class_ids: &[String],
        window: DateWindow,
    ) -> StoreResult<Vec<ClassRecord>> {
        if class_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut url = self.class_url(window)?;
        url.query_pairs_mut()
            .append_pair("class_id", &in_list(class_ids));
        self.fetch_rows(Method::GET, url).await
    }

    async fn classes_in_window(&self, window: DateWindow) -> StoreResult<Vec<ClassRecord>> {
        let mut url = self.class_url(window)?;
        url.query_pairs_mut()
            .append_pair("order", "date.asc,time.asc");
        self.fetch_rows(Method::GET, url).await
    }
}
