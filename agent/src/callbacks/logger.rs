use crate::Result;
use crate::callbacks::Callback;
use crate::llm::Message;
use async_trait::async_trait;
use tracing::info;

/// Logs every new message of an agent conversation exactly once.
///
/// Messages are tracked by hash so that a history rewritten by another
/// callback (for example [`super::SummarizeHistory`]) is logged in full again.
pub struct StepLogger {
    name: String,
    last_hashes: Vec<u64>,
    step: u32,
}

impl StepLogger {
    pub fn new(name: &str) -> Box<Self> {
        Box::new(Self {
            name: name.to_string(),
            last_hashes: Vec::new(),
            step: 0,
        })
    }

    fn log_messages(&self, messages: &[Message]) {
        for message in messages {
            info!(agent = %self.name, step = self.step, "{}", message.to_string().trim_end());
        }
    }

    fn prefix_match_len(&self, new_hashes: &[u64]) -> usize {
        new_hashes
            .iter()
            .zip(self.last_hashes.iter())
            .take_while(|&(a, b)| *a == *b)
            .count()
    }

    /// Index of the first message not yet logged, or `None` when the history
    /// no longer extends what was logged before.
    fn unseen_from(&self, new_hashes: &[u64]) -> Option<usize> {
        if new_hashes.len() < self.last_hashes.len()
            || self.prefix_match_len(new_hashes) != self.last_hashes.len()
        {
            None
        } else {
            Some(self.last_hashes.len())
        }
    }
}

#[async_trait]
impl Callback for StepLogger {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>> {
        let new_hashes = messages.iter().map(Message::get_hash).collect::<Vec<_>>();

        match self.unseen_from(&new_hashes) {
            Some(start) => self.log_messages(&messages[start..]),
            None => {
                info!(agent = %self.name, step = self.step, "history cleared");
                self.log_messages(&messages);
            }
        }

        self.step += 1;
        self.last_hashes = new_hashes;

        Ok(messages)
    }
}
