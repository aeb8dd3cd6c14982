use agent::crew::CrewOutput;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub const MARKDOWN_MIME: &str = "text/markdown";

/// `Quantum Computing` becomes `quantum_computing_blog.md`.
pub fn filename_for(topic: &str) -> String {
    format!("{}_blog.md", topic.to_lowercase().replace(' ', "_"))
}

/// The Markdown export of a generated post.
#[derive(Clone, Debug, PartialEq)]
pub struct Download {
    pub filename: String,
    pub content: Vec<u8>,
}

impl Download {
    pub fn new(topic: &str, output: &CrewOutput) -> Self {
        Self {
            filename: filename_for(topic),
            content: output.raw.as_bytes().to_vec(),
        }
    }

    /// Self-contained `data:` URL, so the page can offer the file without the
    /// server keeping it around.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};charset=utf-8;base64,{}",
            MARKDOWN_MIME,
            STANDARD.encode(&self.content)
        )
    }
}
