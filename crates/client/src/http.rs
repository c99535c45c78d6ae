use async_trait::async_trait;
use domain::protocol::{
    CreateCommentRequest, CreateCommentResponse, ListCommentsQuery, ListCommentsResponse,
    ServerComment,
};
use domain::ProjectId;
use reqwest::{Client, Response};
use url::Url;

use crate::transport::{CommentsTransport, TransportError};

/// `CommentsTransport` over the JSON HTTP API.
///
/// Routes:
/// - `GET  {base}/api/{project_id}/comments/{post_id}?take=&skip=`
/// - `POST {base}/api/{project_id}/comments`
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn check_status(resp: Response) -> Result<Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    Err(TransportError::Status {
        code: status.as_u16(),
        reason: status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_str().to_string()),
    })
}

#[async_trait]
impl CommentsTransport for HttpTransport {
    async fn list(&self, query: &ListCommentsQuery) -> Result<ListCommentsResponse, TransportError> {
        let url = self.endpoint(&[
            "api",
            query.project_id.as_str(),
            "comments",
            query.post_id.as_str(),
        ])?;
        tracing::debug!("GET {} page={:?}", url, query.page);

        let resp = self.client.get(url).query(&query.page).send().await?;
        let body: ListCommentsResponse = check_status(resp)?.json().await?;
        Ok(body)
    }

    async fn create(
        &self,
        project_id: &ProjectId,
        request: &CreateCommentRequest,
    ) -> Result<ServerComment, TransportError> {
        let url = self.endpoint(&["api", project_id.as_str(), "comments"])?;
        tracing::debug!("POST {} txn={}", url, request.txn_id);

        let resp = self.client.post(url).json(request).send().await?;
        let body: CreateCommentResponse = check_status(resp)?.json().await?;
        Ok(body.comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_segments() {
        let transport = HttpTransport::new("http://localhost:3000/").unwrap();
        let url = transport
            .endpoint(&["api", "demo", "comments", "hello world"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/demo/comments/hello%20world"
        );
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let transport = HttpTransport::new("http://localhost:3000/v1").unwrap();
        let url = transport.endpoint(&["api", "demo", "comments"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/v1/api/demo/comments");
    }

    #[test]
    fn rejects_unusable_base() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(TransportError::InvalidUrl(_))
        ));
        assert!(matches!(
            HttpTransport::new("mailto:someone@example.com"),
            Err(TransportError::InvalidUrl(_))
        ));
    }
}
