use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::models::{
    Comment as TrackerComment, CommentPage, Issue as TrackerIssue, Queue, QueuePage,
    Transition as TrackerTransition, TransitionList,
};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Which API family a request path is relative to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ApiRoot {
    Platform,
    ServiceDesk,
}

#[derive(Clone)]
pub struct TrackerClient {
    http: HttpClient,
    config: TrackerConfig,
}

impl TrackerClient {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub async fn get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send_with_body(Method::GET, path, Option::<&Value>::None)
            .await
    }

    pub async fn get_with_query<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_query(ApiRoot::Platform, path, query).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_with_body(Method::POST, path, Some(body)).await
    }

    pub async fn put<B>(&self, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        self.send_expect_empty(ApiRoot::Platform, Method::PUT, path, Some(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send_expect_empty(ApiRoot::Platform, Method::DELETE, path, None::<&Value>)
            .await
    }

    pub async fn send_with_body<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRoot::Platform, method, path, body).await
    }

    async fn send_json<B, T>(
        &self,
        root: ApiRoot,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url_for(root, path);
        debug!(%method, %url, "tracker request");
        let mut request = self.http.request(method, url);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        Self::parse_json(response).await
    }

    async fn request_with_query<T>(
        &self,
        root: ApiRoot,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url_for(root, path);
        debug!(%url, ?query, "tracker request");
        let response = self.http.get(url).query(query).send().await?;
        Self::parse_json(response).await
    }

    async fn send_expect_empty<B>(
        &self,
        root: ApiRoot,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url_for(root, path);
        debug!(%method, %url, "tracker request");
        let mut request = self.http.request(method, url);
        if let Some(payload) = body {
            request = request.json(payload);
        }
        let response = request.send().await?;
        Self::ensure_success(response).await
    }

    fn url_for(&self, root: ApiRoot, path: &str) -> String {
        let mut base = match root {
            ApiRoot::Platform => self.config.api_root(),
            ApiRoot::ServiceDesk => self.config.service_desk_root(),
        };
        base.push_str(path.trim_start_matches('/'));
        base
    }

    async fn parse_json<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(TrackerError::from)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn ensure_success(response: Response) -> Result<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: Response) -> TrackerError {
        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        warn!(%status, %url, "tracker request failed");
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => TrackerError::Authentication(
                format!("Access denied ({}) - {}", status, summarize_error_body(&body)),
            ),
            StatusCode::NOT_FOUND => TrackerError::NotFound(summarize_error_body(&body)),
            _ => build_http_error(status, &body),
        }
    }

    pub async fn get_issue(&self, issue_key: &str) -> Result<TrackerIssue> {
        let path = format!("issue/{}", issue_key);
        self.get_with_query(&path, &[("fields", ISSUE_SUMMARY_FIELDS.to_string())])
            .await
    }

    pub async fn update_description<B>(&self, issue_key: &str, description: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let path = format!("issue/{}", issue_key);
        let payload = IssueUpdateRequest {
            fields: DescriptionFields { description },
        };
        self.put(&path, &payload).await
    }

    pub async fn get_comments(&self, issue_key: &str) -> Result<Vec<TrackerComment>> {
        let path = format!("issue/{}/comment", issue_key);
        let page: CommentPage = self.get(&path).await?;
        Ok(page.comments)
    }

    pub async fn add_comment<B>(&self, issue_key: &str, body: &B) -> Result<TrackerComment>
    where
        B: Serialize + ?Sized,
    {
        let path = format!("issue/{}/comment", issue_key);
        let payload = CommentCreateRequest { body };
        self.post(&path, &payload).await
    }

    pub async fn get_transitions(&self, issue_key: &str) -> Result<Vec<TrackerTransition>> {
        let path = format!("issue/{}/transitions", issue_key);
        let list: TransitionList = self.get(&path).await?;
        Ok(list.transitions)
    }

    /// Moves an issue along a transition, optionally attaching a rich-text comment.
    pub async fn execute_transition<B>(
        &self,
        issue_key: &str,
        transition_id: &str,
        comment: Option<&B>,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let path = format!("issue/{}/transitions", issue_key);
        let payload = TransitionExecuteRequest {
            transition: TransitionRef { id: transition_id },
            update: comment.map(|body| TransitionUpdate {
                comment: vec![CommentAdd {
                    add: CommentCreateRequest { body },
                }],
            }),
        };
        self.send_expect_empty(ApiRoot::Platform, Method::POST, &path, Some(&payload))
            .await
    }

    /// Lists every queue of a service desk, following pagination until the last page.
    pub async fn get_queues(&self, service_desk_id: &str) -> Result<Vec<Queue>> {
        let path = format!("servicedesk/{}/queue", service_desk_id);
        let mut queues = Vec::new();
        let mut start = 0u64;
        loop {
            let page: QueuePage = self
                .request_with_query(
                    ApiRoot::ServiceDesk,
                    &path,
                    &[
                        ("start", start.to_string()),
                        ("limit", QUEUE_PAGE_LIMIT.to_string()),
                        ("includeCount", "true".to_string()),
                    ],
                )
                .await?;
            let fetched = page.values.len() as u64;
            queues.extend(page.values);
            if page.is_last_page || fetched == 0 {
                break;
            }
            start += fetched;
        }
        Ok(queues)
    }

    pub async fn create_queue(&self, service_desk_id: &str, name: &str, jql: &str) -> Result<Queue> {
        let path = format!("servicedesk/{}/queue", service_desk_id);
        let payload = QueueCreateRequest { name, jql };
        self.send_json(ApiRoot::ServiceDesk, Method::POST, &path, Some(&payload))
            .await
    }

    pub async fn delete_queue(&self, service_desk_id: &str, queue_id: &str) -> Result<()> {
        let path = format!("servicedesk/{}/queue/{}", service_desk_id, queue_id);
        self.send_expect_empty(ApiRoot::ServiceDesk, Method::DELETE, &path, None::<&Value>)
            .await
    }
}

fn build_http_client(config: &TrackerConfig) -> Result<HttpClient> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(config.authorization())?);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value(config.user_agent.clone())?);

    HttpClient::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|err| TrackerError::Other(err.to_string()))
}

fn header_value(value: String) -> Result<HeaderValue> {
    HeaderValue::from_str(&value).map_err(|err| TrackerError::Other(err.to_string()))
}

fn build_http_error(status: StatusCode, body: &str) -> TrackerError {
    let messages = extract_error_messages(body);
    TrackerError::http(status, messages, summarize_error_body(body))
}

/// Collects `errorMessages` and per-field `errors` from an error response body.
fn extract_error_messages(body: &str) -> Vec<String> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    let mut messages: Vec<String> = value
        .get("errorMessages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    if let Some(fields) = value.get("errors").and_then(Value::as_object) {
        for (field, message) in fields {
            if let Some(text) = message.as_str() {
                messages.push(format!("{}: {}", field, text));
            }
        }
    }
    messages
}

fn summarize_error_body(body: &str) -> String {
    let messages = extract_error_messages(body);
    if messages.is_empty() {
        body.trim().to_string()
    } else {
        messages.join("; ")
    }
}

const ISSUE_SUMMARY_FIELDS: &str = "summary,description,status,priority";
const QUEUE_PAGE_LIMIT: u64 = 50;

#[derive(Debug, Serialize)]
struct CommentCreateRequest<'a, B: ?Sized> {
    body: &'a B,
}

#[derive(Debug, Serialize)]
struct IssueUpdateRequest<'a, B: ?Sized> {
    fields: DescriptionFields<'a, B>,
}

#[derive(Debug, Serialize)]
struct DescriptionFields<'a, B: ?Sized> {
    description: &'a B,
}

#[derive(Debug, Serialize)]
struct TransitionExecuteRequest<'a, B: ?Sized> {
    transition: TransitionRef<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<TransitionUpdate<'a, B>>,
}

#[derive(Debug, Serialize)]
struct TransitionRef<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct TransitionUpdate<'a, B: ?Sized> {
    comment: Vec<CommentAdd<'a, B>>,
}

#[derive(Debug, Serialize)]
struct CommentAdd<'a, B: ?Sized> {
    add: CommentCreateRequest<'a, B>,
}

#[derive(Debug, Serialize)]
struct QueueCreateRequest<'a> {
    name: &'a str,
    jql: &'a str,
}
