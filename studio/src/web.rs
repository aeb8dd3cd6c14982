//! Single-page web UI: a topic/temperature form, the generated post, and its
//! Markdown download. A small JSON API mirrors the form for scripted use.

use crate::download::{Download, MARKDOWN_MIME};
use crate::pipeline::ContentPipeline;
use agent::ErrorKind;
use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const EMPTY_TOPIC_WARNING: &str = "Please enter a topic first.";
pub const TEMPERATURE_WARNING: &str = "Temperature must be between 0.0 and 1.0.";
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ContentPipeline>,
}

pub fn router(pipeline: Arc<ContentPipeline>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate))
        .route("/api/generate", post(api_generate))
        .route("/health", get(health_check))
        .with_state(AppState { pipeline })
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// Form fields as the browser sends them. The temperature stays a string so a
/// blank or garbled value gets the page warning instead of an extractor error.
#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    temperature: Option<String>,
}

impl From<GenerateForm> for GenerateRequest {
    fn from(form: GenerateForm) -> Self {
        let temperature = match form.temperature {
            None => DEFAULT_TEMPERATURE,
            // NaN fails the range check
            Some(value) => value.trim().parse().unwrap_or(f32::NAN),
        };
        Self {
            topic: form.topic,
            temperature,
        }
    }
}

impl GenerateRequest {
    /// The trimmed topic, or the warning to show instead of running the
    /// pipeline.
    fn validate(&self) -> Result<&str, &'static str> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(EMPTY_TOPIC_WARNING);
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(TEMPERATURE_WARNING);
        }
        Ok(topic)
    }
}

enum Outcome {
    Blank,
    Warning(&'static str),
    Generated { html: String, download: Download },
    Failed { kind: ErrorKind, message: String },
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Blank => String::new(),
        Outcome::Warning(warning) => {
            format!(r#"<div class="warning">{}</div>"#, escape_html(warning))
        }
        Outcome::Generated { html, download } => format!(
            r#"<section class="result">
<h3>📝 Generated Content</h3>
<article>{html}</article>
<a class="download" href="{href}" download="{filename}" type="{mime}">📥 Download Markdown</a>
</section>"#,
            html = html,
            href = download.data_url(),
            filename = escape_html(&download.filename),
            mime = MARKDOWN_MIME,
        ),
        Outcome::Failed { kind, message } => format!(
            r#"<div class="error"><p>An error occurred ({}):</p><pre>{}</pre></div>"#,
            kind,
            escape_html(message)
        ),
    }
}

fn render_page(topic: &str, temperature: f32, outcome: &Outcome) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Content Researcher &amp; Writer</title>
<style>
body {{ font-family: sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }}
textarea, button {{ width: 100%; box-sizing: border-box; }}
button {{ padding: .6rem; margin-top: 1rem; }}
.warning {{ background: #fff4ce; padding: .8rem; margin: 1rem 0; }}
.error {{ background: #fde7e9; padding: .8rem; margin: 1rem 0; }}
.error pre {{ white-space: pre-wrap; }}
#spinner {{ display: none; }}
</style>
</head>
<body>
<h1>✍️ Content Researcher &amp; Writer</h1>
<p>Generate blog posts about any topic using a research agent and a writing agent.</p>
<form method="post" action="/generate" onsubmit="document.getElementById('spinner').style.display='block'">
<label for="topic">Enter your topic</label>
<textarea id="topic" name="topic" rows="4" placeholder="Enter the topic">{topic}</textarea>
<h3>LLM Settings</h3>
<label for="temperature">Temperature: <output id="temperature-value">{temperature:.2}</output></label>
<input id="temperature" name="temperature" type="range" min="0" max="1" step="0.01" value="{temperature:.2}" oninput="document.getElementById('temperature-value').value=Number(this.value).toFixed(2)">
<button type="submit">Generate Content</button>
</form>
<p id="spinner">Generating content...</p>
<details>
<summary>ℹ️ How to use</summary>
<ol>
<li>Enter your topic</li>
<li>Adjust temperature</li>
<li>Click <strong>Generate Content</strong></li>
<li>Download your blog post in Markdown</li>
</ol>
</details>
{outcome}
<hr>
<footer>Built using Rust, axum, and OpenRouter</footer>
</body>
</html>
"#,
        topic = escape_html(topic),
        temperature = temperature,
        outcome = render_outcome(outcome),
    )
}

#[instrument(skip_all)]
async fn index() -> Html<String> {
    Html(render_page("", DEFAULT_TEMPERATURE, &Outcome::Blank))
}

#[instrument(skip_all)]
async fn generate(
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> Html<String> {
    let request = GenerateRequest::from(form);
    let topic = match request.validate() {
        Ok(topic) => topic,
        Err(warning) => {
            warn!(warning, "generation request rejected");
            let temperature = if request.temperature.is_finite() {
                request.temperature
            } else {
                DEFAULT_TEMPERATURE
            };
            return Html(render_page(
                &request.topic,
                temperature,
                &Outcome::Warning(warning),
            ));
        }
    };

    let outcome = match state.pipeline.generate(topic, request.temperature).await {
        Ok(output) => {
            info!(chars = output.raw.len(), temperature = request.temperature, "content generated");
            Outcome::Generated {
                html: comrak::markdown_to_html(&output.raw, &comrak::Options::default()),
                download: Download::new(topic, &output),
            }
        }
        Err(err) => {
            error!(error = %err, kind = %err.kind(), "content generation failed");
            Outcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    };

    Html(render_page(topic, request.temperature, &outcome))
}

#[instrument(skip_all)]
async fn api_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let topic = match request.validate() {
        Ok(topic) => topic,
        Err(warning) => {
            warn!(warning, "generation request rejected");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "warning": warning })),
            )
                .into_response();
        }
    };

    match state.pipeline.generate(topic, request.temperature).await {
        Ok(output) => {
            let download = Download::new(topic, &output);
            (
                StatusCode::OK,
                Json(json!({
                    "filename": download.filename,
                    "content": output.raw,
                    "tasks_output": output.tasks_output,
                })),
            )
                .into_response()
        }
        Err(err) => {
            error!(error = %err, kind = %err.kind(), "content generation failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string(), "kind": err.kind() })),
            )
                .into_response()
        }
    }
}

#[instrument(skip_all)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
