//! Course catalog and order management backend.

use crate::error::BackendError;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub price: f64,
    pub currency: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub course: String,
    pub price: f64,
    pub currency: String,
    pub user_email: String,
    pub user_name: String,
    pub status: String,
    /// Keeps the backend's UTC offset.
    pub created_at: DateTime<FixedOffset>,
    /// Null, or the zero time, until the order is paid.
    #[serde(default)]
    pub paid_at: Option<DateTime<FixedOffset>>,
}

/// Body of `POST /orders`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub course: String,
    pub user_name: String,
    pub user_email: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, BackendError>;

    async fn get_course(&self, name: &str) -> Result<Course, BackendError>;

    /// Not idempotent: every call creates a new order.
    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError>;

    async fn get_order(&self, id: &str) -> Result<Order, BackendError>;

    /// Where the user completes payment for `order_id`.
    fn payment_url(&self, order_id: &str) -> String;
}

/// `CatalogClient` over the backend's REST interface.
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidBaseUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// Appends percent-encoded path segments to the base url.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let body = response.bytes().await?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "Backend responded.");

        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_courses(&self) -> Result<Vec<Course>, BackendError> {
        self.execute(self.http.get(self.endpoint(&["courses"]))).await
    }

    async fn get_course(&self, name: &str) -> Result<Course, BackendError> {
        self.execute(self.http.get(self.endpoint(&["courses", name])))
            .await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        self.execute(self.http.post(self.endpoint(&["orders"])).json(order))
            .await
    }

    async fn get_order(&self, id: &str) -> Result<Order, BackendError> {
        self.execute(self.http.get(self.endpoint(&["orders", id])))
            .await
    }

    fn payment_url(&self, order_id: &str) -> String {
        self.endpoint(&["orders", order_id, "payment"]).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    fn course_json() -> serde_json::Value {
        json!({
            "name": "secure-coding-101",
            "display_name": "Secure Coding 101",
            "description": "Write code that survives contact with attackers.",
            "price": 49.0,
            "currency": "USD"
        })
    }

    fn order_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "course": "secure-coding-101",
            "price": 49.0,
            "currency": "USD",
            "user_email": "jane@example.com",
            "user_name": "Jane Doe",
            "status": "pending",
            "created_at": "2024-05-01T10:00:00Z",
            "paid_at": null
        })
    }

    fn client(server: &MockServer) -> HttpCatalogClient {
        HttpCatalogClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_courses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([course_json()])))
            .expect(1)
            .mount(&server)
            .await;

        let courses = client(&server).list_courses().await.unwrap();

        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].name, "secure-coding-101");
        assert_eq!(courses[0].price, 49.0);
    }

    #[tokio::test]
    async fn test_create_order_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_json(json!({
                "course": "secure-coding-101",
                "user_name": "Jane Doe",
                "user_email": "jane@example.com"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(order_json("ord-123")))
            .expect(1)
            .mount(&server)
            .await;

        let order = client(&server)
            .create_order(&NewOrder {
                course: "secure-coding-101".to_string(),
                user_name: "Jane Doe".to_string(),
                user_email: "jane@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(order.id, "ord-123");
        assert_eq!(order.paid_at, None);
    }

    #[tokio::test]
    async fn test_get_order_with_zero_paid_at() {
        let server = MockServer::start().await;
        let mut body = order_json("ord-9");
        body["paid_at"] = json!("0001-01-01T00:00:00Z");
        Mock::given(method("GET"))
            .and(path("/orders/ord-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let order = client(&server).get_order("ord-9").await.unwrap();

        let paid_at = order.paid_at.unwrap();
        assert_eq!(paid_at.to_rfc3339(), "0001-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn test_get_order_keeps_timestamp_offsets() {
        let server = MockServer::start().await;
        let mut body = order_json("ord-7");
        body["created_at"] = json!("2024-05-01T10:00:00+07:00");
        body["paid_at"] = json!("2024-05-01T10:05:00+07:00");
        Mock::given(method("GET"))
            .and(path("/orders/ord-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let order = client(&server).get_order("ord-7").await.unwrap();
        let value = serde_json::to_value(&order).unwrap();

        assert_eq!(value["created_at"], "2024-05-01T10:00:00+07:00");
        assert_eq!(value["paid_at"], "2024-05-01T10:05:00+07:00");
    }

    #[tokio::test]
    async fn test_not_found_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses/nonexistent-course"))
            .respond_with(ResponseTemplate::new(404).set_body_string("course not found"))
            .mount(&server)
            .await;

        let err = client(&server)
            .get_course("nonexistent-course")
            .await
            .unwrap_err();

        match err {
            BackendError::Status { status, url, body } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/courses/nonexistent-course"));
                assert_eq!(body, "course not found");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_courses().await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses/a%20b%2Fc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(course_json()))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).get_course("a b/c").await.unwrap();
    }

    #[test]
    fn test_payment_url() {
        let client =
            HttpCatalogClient::new("http://localhost:8080", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.payment_url("ord-123"),
            "http://localhost:8080/orders/ord-123/payment"
        );

        let nested =
            HttpCatalogClient::new("https://shop.example.com/api/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            nested.payment_url("ord-123"),
            "https://shop.example.com/api/orders/ord-123/payment"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(matches!(
            HttpCatalogClient::new("mailto:sales@example.com", Duration::from_secs(1)),
            Err(BackendError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            HttpCatalogClient::new("not a url", Duration::from_secs(1)),
            Err(BackendError::Url(_))
        ));
    }
}
