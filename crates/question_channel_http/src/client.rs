use reqwest::Client;
use url::Url;

use question_channel::{ChannelInitError, QuestionChannel, QuestionRequest, QuestionResponse};

use crate::config::ChannelConfig;
use crate::error::{parse_error_message, HttpChannelError};

const CHAT_PATH: &str = "api/v1/chat";

/// `QuestionChannel` implementation backed by the assessment backend's HTTP
/// chat endpoint.
#[derive(Debug)]
pub struct HttpQuestionChannel {
    http: Client,
    endpoint: Url,
}

impl HttpQuestionChannel {
    pub fn new(config: ChannelConfig) -> Result<Self, ChannelInitError> {
        Self::build(config).map_err(map_init_error)
    }

    fn build(config: ChannelConfig) -> Result<Self, HttpChannelError> {
        let endpoint = chat_endpoint(&config.base_url)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(HttpChannelError::Request)?;

        Ok(Self { http, endpoint })
    }

    /// Returns the fully resolved chat endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn fetch_async(
        &self,
        request: &QuestionRequest,
    ) -> Result<QuestionResponse, HttpChannelError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpChannelError::Status {
                status,
                message: parse_error_message(status, &body),
            });
        }

        response
            .json::<QuestionResponse>()
            .await
            .map_err(HttpChannelError::MalformedResponse)
    }
}

impl QuestionChannel for HttpQuestionChannel {
    fn fetch(&self, request: QuestionRequest) -> Result<QuestionResponse, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| HttpChannelError::Runtime(error).to_string())?;

        runtime
            .block_on(self.fetch_async(&request))
            .map_err(|error| error.to_string())
    }
}

fn map_init_error(error: HttpChannelError) -> ChannelInitError {
    ChannelInitError::new(format!("failed to initialize HTTP question channel: {error}"))
}

fn chat_endpoint(base_url: &str) -> Result<Url, HttpChannelError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(HttpChannelError::InvalidBaseUrl(base_url.to_string()));
    }

    Url::parse(&format!("{trimmed}/{CHAT_PATH}"))
        .map_err(|_| HttpChannelError::InvalidBaseUrl(base_url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{chat_endpoint, HttpQuestionChannel};
    use crate::config::ChannelConfig;
    use crate::error::HttpChannelError;

    #[test]
    fn endpoint_appends_chat_path_once() {
        assert_eq!(
            chat_endpoint("http://127.0.0.1:5000")
                .expect("valid base url")
                .as_str(),
            "http://127.0.0.1:5000/api/v1/chat"
        );
        assert_eq!(
            chat_endpoint("https://assess.example.com/")
                .expect("trailing slash is normalized")
                .as_str(),
            "https://assess.example.com/api/v1/chat"
        );
    }

    #[test]
    fn blank_or_unparsable_base_url_is_rejected() {
        assert!(matches!(
            chat_endpoint("   "),
            Err(HttpChannelError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            chat_endpoint("not a url"),
            Err(HttpChannelError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn channel_construction_resolves_default_endpoint() {
        let channel =
            HttpQuestionChannel::new(ChannelConfig::default()).expect("default config is valid");
        assert_eq!(channel.endpoint(), "http://127.0.0.1:5000/api/v1/chat");
    }

    #[test]
    fn invalid_config_surfaces_a_contract_level_init_error() {
        let error = HttpQuestionChannel::new(ChannelConfig::new("not a url"))
            .expect_err("unparsable base url is rejected");
        assert!(error.message().contains("invalid base URL 'not a url'"));
    }
}
