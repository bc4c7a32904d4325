use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use super::error::ProctorError;
use crate::dto::quiz_dto::{
    AnswerSubmission, ErrorResponse, QuizResultView, StudentQuiz, SubmitQuizRequest,
    SubmitQuizResponse, TakeQuizResponse,
};
use crate::error::Rejection;

/// The two server calls a session makes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizApi: Send + Sync {
    async fn fetch_quiz(&self, quiz_id: Uuid) -> Result<StudentQuiz, ProctorError>;

    async fn submit(
        &self,
        quiz_id: Uuid,
        answers: Vec<AnswerSubmission>,
    ) -> Result<QuizResultView, ProctorError>;
}

/// [`QuizApi`] over the quiz HTTP routes, authenticated with a bearer token.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpQuizApi {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ProctorError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Self::with_client(client, base_url, token)
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        token: impl Into<String>,
    ) -> Result<Self, ProctorError> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProctorError> {
        Ok(self.base_url.join(path)?)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ProctorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await?;
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => match serde_json::from_value::<Rejection>(serde_json::Value::String(
                err.code.clone(),
            )) {
                Ok(rejection) => Err(ProctorError::Rejected {
                    rejection,
                    message: err.message,
                }),
                Err(_) => Err(ProctorError::Unexpected(format!(
                    "{} {}: {}",
                    status, err.code, err.message
                ))),
            },
            Err(_) => Err(ProctorError::Unexpected(format!("{}: {}", status, body))),
        }
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn fetch_quiz(&self, quiz_id: Uuid) -> Result<StudentQuiz, ProctorError> {
        let url = self.endpoint(&format!("api/quiz/take/{}", quiz_id))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let body: TakeQuizResponse = Self::decode(response).await?;
        Ok(body.quiz)
    }

    async fn submit(
        &self,
        quiz_id: Uuid,
        answers: Vec<AnswerSubmission>,
    ) -> Result<QuizResultView, ProctorError> {
        let url = self.endpoint(&format!("api/quiz/submit/{}", quiz_id))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&SubmitQuizRequest { answers })
            .send()
            .await?;
        let body: SubmitQuizResponse = Self::decode(response).await?;
        tracing::info!(%quiz_id, score = body.result.score, "Submission accepted");
        Ok(body.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_under_base_path() {
        let api = HttpQuizApi::with_client(Client::new(), "http://localhost:8080/lms", "t").unwrap();
        let id = Uuid::nil();
        assert_eq!(
            api.endpoint(&format!("api/quiz/take/{}", id)).unwrap().as_str(),
            format!("http://localhost:8080/lms/api/quiz/take/{}", id)
        );

        let trailing = HttpQuizApi::with_client(Client::new(), "http://localhost:8080/", "t").unwrap();
        assert_eq!(
            trailing.endpoint("api/quiz/all").unwrap().as_str(),
            "http://localhost:8080/api/quiz/all"
        );
    }

    #[test]
    fn bad_base_url_is_reported() {
        let err = HttpQuizApi::with_client(Client::new(), "not a url", "t").err().unwrap();
        assert!(matches!(err, ProctorError::Url(_)));
    }
}
