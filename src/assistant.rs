//! # OpenAI Assistant
//!
//! Thin HTTP client for the Assistants and Files APIs.
//!
//! A chat request runs the full thread lifecycle against one fixed,
//! pre-configured assistant: create a thread, append the user message,
//! start a run, poll the run once per second until it leaves the
//! `queued`/`in_progress` states, then read the newest assistant message
//! back out of the thread. The poll interval is fixed and the run is
//! awaited until terminal; it only ever blocks its own request.
//!
//! File operations proxy the Files API so uploads never touch local disk,
//! and `attach_file` registers an uploaded file with the assistant.

use std::time::Duration;

use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::{config::Config, error::AppError};

const BETA_HEADER: (&str, &str) = ("OpenAI-Beta", "assistants=v2");
const POLL_INTERVAL: Duration = Duration::from_secs(1);

pub const NO_TEXT_RESPONSE: &str = "No text response found.";
pub const NO_RESPONSE: &str = "No response from assistant.";

#[derive(Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

#[derive(Deserialize)]
pub struct RunObject {
    pub id: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct MessageList {
    pub data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
pub struct ThreadMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextBlock>,
}

#[derive(Deserialize)]
pub struct TextBlock {
    pub value: String,
}

#[derive(Deserialize, Serialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Deserialize, Serialize)]
pub struct FileList {
    pub data: Vec<FileObject>,
}

#[derive(Deserialize, Serialize)]
pub struct DeletedFile {
    pub id: String,
    pub deleted: bool,
}

pub struct Assistant {
    http: Client,
    base_url: String,
    api_key: String,
    assistant_id: String,
}

impl Assistant {
    pub fn new(config: &Config) -> Self {
        Self {
            http: Client::new(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            assistant_id: config.assistant_id.clone(),
        }
    }

    /// Runs one prompt through the configured assistant and returns its
    /// text reply, or a fixed fallback string when the run produced none.
    pub async fn query(&self, prompt: &str) -> Result<String, AppError> {
        let thread: ThreadObject = self.post_json("threads", &json!({})).await?;

        let _: Value = self
            .post_json(
                &format!("threads/{}/messages", thread.id),
                &json!({ "role": "user", "content": prompt }),
            )
            .await?;

        let run: RunObject = self
            .post_json(
                &format!("threads/{}/runs", thread.id),
                &json!({ "assistant_id": self.assistant_id }),
            )
            .await?;

        let mut status = run.status;
        while status == "queued" || status == "in_progress" {
            sleep(POLL_INTERVAL).await;

            let current: RunObject = self
                .get_json(&format!("threads/{}/runs/{}", thread.id, run.id))
                .await?;
            status = current.status;
        }

        let messages: MessageList = self
            .get_json(&format!("threads/{}/messages", thread.id))
            .await?;

        Ok(extract_reply(messages))
    }

    pub async fn upload_file(
        &self,
        filename: String,
        bytes: Vec<u8>,
    ) -> Result<FileObject, AppError> {
        let form = Form::new()
            .text("purpose", "assistants")
            .part("file", Part::bytes(bytes).file_name(filename));

        let response = self
            .authorized(self.http.post(self.url("files")))
            .multipart(form)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn list_files(&self) -> Result<FileList, AppError> {
        self.get_json("files").await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<DeletedFile, AppError> {
        let response = self
            .authorized(self.http.delete(self.url(&format!("files/{file_id}"))))
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    /// Registers an already-uploaded file with the assistant so later runs
    /// can read it.
    pub async fn attach_file(&self, file_id: &str) -> Result<Value, AppError> {
        self.post_json(
            &format!("assistants/{}/files", self.assistant_id),
            &json!({ "file_id": file_id }),
        )
        .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER.0, BETA_HEADER.1)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, AppError> {
        let response = self
            .authorized(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.authorized(self.http.get(self.url(path))).send().await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AppError::AssistantApi(format!("{status}: {body}")))
    }
}

/// The list arrives newest-first; reversed to chronological order, the
/// first assistant entry is the reply to the message just posted (threads
/// are created per query, so it is the only one).
pub fn extract_reply(list: MessageList) -> String {
    let mut data = list.data;
    data.reverse();

    let Some(message) = data.into_iter().find(|m| m.role == "assistant") else {
        return NO_RESPONSE.to_string();
    };

    message
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .map(|text| text.value)
        .unwrap_or_else(|| NO_TEXT_RESPONSE.to_string())
}
