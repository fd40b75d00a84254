//! Supabase (PostgREST) implementation of [`RemoteService`].

use std::fmt;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{Collection, RemoteError, RemoteResult, RemoteService};
use crate::util::compact_text;

#[derive(Clone)]
pub struct SupabaseDataClient {
    rest_url: String,
    anon_key: String,
    access_token: Option<String>,
    client: Client,
}

impl fmt::Debug for SupabaseDataClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseDataClient")
            .field("rest_url", &self.rest_url)
            .field("anon_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl SupabaseDataClient {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>) -> RemoteResult<Self> {
        let rest_url = normalize_rest_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(RemoteError::InvalidConfiguration(
                "Supabase anon key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            rest_url,
            anon_key,
            access_token: None,
            client: Client::builder().build()?,
        })
    }

    /// Act as a signed-in user instead of the anonymous role
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        let token = access_token.into().trim().to_string();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.rest_url, collection.table_name())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api(parse_api_error(status, &body)));
        }
        Ok(response)
    }

    /// Send a request that must touch at least one row
    async fn send_expecting_rows(
        &self,
        request: RequestBuilder,
        collection: Collection,
        id: &str,
    ) -> RemoteResult<()> {
        let response = self
            .send(request.header("Prefer", "return=representation"))
            .await?;
        let rows = response.json::<Vec<Value>>().await?;
        if rows.is_empty() {
            return Err(RemoteError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

impl RemoteService for SupabaseDataClient {
    async fn insert(&self, collection: Collection, record: Value) -> RemoteResult<()> {
        tracing::debug!("POST {}", collection);
        let request = self
            .client
            .post(self.table_url(collection))
            .header("Prefer", "return=minimal")
            .json(&record);
        self.send(request).await?;
        Ok(())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Value) -> RemoteResult<()> {
        tracing::debug!("PATCH {} id={}", collection, id);
        let request = self
            .client
            .patch(id_filter_url(&self.table_url(collection), id))
            .json(&fields);
        self.send_expecting_rows(request, collection, id).await
    }

    /// Deleting a row that is already gone succeeds, so replays are harmless
    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()> {
        tracing::debug!("DELETE {} id={}", collection, id);
        let request = self
            .client
            .delete(id_filter_url(&self.table_url(collection), id))
            .header("Prefer", "return=minimal");
        self.send(request).await?;
        Ok(())
    }

    async fn upsert(
        &self,
        collection: Collection,
        record: Value,
        conflict_columns: &[&str],
    ) -> RemoteResult<()> {
        tracing::debug!("UPSERT {} on {:?}", collection, conflict_columns);
        let request = self
            .client
            .post(on_conflict_url(&self.table_url(collection), conflict_columns))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&record);
        self.send(request).await?;
        Ok(())
    }
}

/// Resolve the PostgREST base URL for a Supabase project URL
pub fn normalize_rest_url(url: &str) -> RemoteResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must not be empty".to_string(),
        ));
    }
    if !crate::util::is_http_url(trimmed) {
        return Err(RemoteError::InvalidConfiguration(
            "Supabase URL must include http:// or https://".to_string(),
        ));
    }
    if trimmed.ends_with("/rest/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/rest/v1"))
    }
}

fn id_filter_url(table_url: &str, id: &str) -> String {
    format!("{table_url}?id=eq.{}", urlencoding::encode(id))
}

fn on_conflict_url(table_url: &str, conflict_columns: &[&str]) -> String {
    if conflict_columns.is_empty() {
        return table_url.to_string();
    }
    format!(
        "{table_url}?on_conflict={}",
        urlencoding::encode(&conflict_columns.join(","))
    )
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            let mut rendered = message.trim().to_string();
            for extra in [payload.details, payload.hint].into_iter().flatten() {
                let extra = extra.trim();
                if !extra.is_empty() {
                    rendered.push_str("; ");
                    rendered.push_str(extra);
                }
            }
            return format!("{} ({})", compact_text(&rendered), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn normalize_rest_url_appends_rest_path() {
        let normalized = normalize_rest_url("https://demo.supabase.co/").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn normalize_rest_url_keeps_existing_rest_path() {
        let normalized = normalize_rest_url("https://demo.supabase.co/rest/v1").unwrap();
        assert_eq!(normalized, "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn normalize_rest_url_rejects_invalid_values() {
        assert!(normalize_rest_url("  ").is_err());
        assert!(normalize_rest_url("demo.supabase.co").is_err());
    }

    #[test]
    fn new_rejects_blank_anon_key() {
        assert!(SupabaseDataClient::new("https://demo.supabase.co", " ").is_err());
    }

    #[test]
    fn id_filter_url_encodes_value() {
        assert_eq!(
            id_filter_url("https://x/rest/v1/snippets", "a b&c"),
            "https://x/rest/v1/snippets?id=eq.a%20b%26c"
        );
    }

    #[test]
    fn on_conflict_url_joins_columns() {
        assert_eq!(
            on_conflict_url("https://x/rest/v1/ratings", &["user_id", "snippet_id"]),
            "https://x/rest/v1/ratings?on_conflict=user_id%2Csnippet_id"
        );
        assert_eq!(
            on_conflict_url("https://x/rest/v1/ratings", &[]),
            "https://x/rest/v1/ratings"
        );
    }

    #[test]
    fn parse_api_error_prefers_postgrest_message() {
        let body = r#"{"code":"23503","message":"insert violates foreign key","details":"Key (snippet_id) is not present","hint":null}"#;
        assert_eq!(
            parse_api_error(StatusCode::CONFLICT, body),
            "insert violates foreign key; Key (snippet_id) is not present (409)"
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, ""),
            "HTTP 502"
        );
    }

    fn client_for(server: &mockito::ServerGuard) -> SupabaseDataClient {
        SupabaseDataClient::new(server.url(), "anon").unwrap()
    }

    #[tokio::test]
    async fn delete_of_missing_row_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/rest/v1/snippets")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.s1".into()))
            .match_header("apikey", "anon")
            .with_status(204)
            .expect(2)
            .create_async()
            .await;
        let client = client_for(&server);

        client.delete(Collection::Snippets, "s1").await.unwrap();
        client.delete(Collection::Snippets, "s1").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/snippets")
            .match_query(Matcher::UrlEncoded("id".into(), "eq.s1".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;
        let client = client_for(&server);

        let error = client
            .update(Collection::Snippets, "s1", serde_json::json!({ "title": "New" }))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            RemoteError::NotFound {
                collection: Collection::Snippets,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn api_errors_carry_postgrest_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/comments")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Could not find the 'author_id' column"}"#)
            .create_async()
            .await;
        let client = client_for(&server);

        let error = client
            .insert(Collection::Comments, serde_json::json!({ "author_id": "u1" }))
            .await
            .unwrap_err();

        assert_eq!(
            error.to_string(),
            "Remote API error: Could not find the 'author_id' column (400)"
        );
    }

    #[test]
    fn debug_redacts_keys() {
        let client = SupabaseDataClient::new("https://demo.supabase.co", "anon-secret")
            .unwrap()
            .with_access_token("user-secret");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("anon-secret"));
        assert!(!rendered.contains("user-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
