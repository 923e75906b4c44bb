use std::thread;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("HTTP status {status}{}", body_suffix(.body))]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("request failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: usize, last: Box<HttpError> },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" ({body})")
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub attempts: usize,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_secs(6),
            attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn get_text_with_retries(
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
) -> Result<String, HttpError> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    let mut last_error = None;
    for attempt in 1..=attempts {
        let mut request = agent.get(url).set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        let err = match request.call() {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()));
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response
                    .into_string()
                    .ok()
                    .unwrap_or_default()
                    .trim()
                    .chars()
                    .take(240)
                    .collect::<String>();
                let err = HttpError::Status { status, body };
                if !should_retry_http_status(status) {
                    return Err(err);
                }
                err
            }
            Err(ureq::Error::Transport(err)) => HttpError::Transport(err.to_string()),
        };

        tracing::debug!(url, attempt, error = %err, "metadata request failed");
        last_error = Some(err);
        if attempt < attempts {
            thread::sleep(policy.retry_delay);
        }
    }

    let last =
        last_error.unwrap_or_else(|| HttpError::Transport("no attempt was made".to_string()));
    Err(HttpError::Exhausted {
        attempts,
        last: Box::new(last),
    })
}
