//! In-process fakes for the session's backends and live leg.

use async_trait::async_trait;
use gemini_realtime::{LiveClientMessage, LiveError, LiveServerMessage, LiveSink, LiveSource};
use std::sync::Arc;
use tokio::sync::mpsc;
use voice_agent_core::{
    Backends, BackendError,
    catalog::{CatalogClient, Course, NewOrder, Order},
    content::{ContentMatch, Embedder, VectorStore},
};

pub fn course(name: &str) -> Course {
    Course {
        name: name.to_string(),
        display_name: "Secure Coding 101".to_string(),
        description: "Defensive programming for web developers".to_string(),
        price: 49.0,
        currency: "USD".to_string(),
    }
}

/// A catalog with one course. `blocking-course` never answers.
pub struct FakeCatalog;

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_courses(&self) -> Result<Vec<Course>, BackendError> {
        Ok(vec![course("secure-coding-101")])
    }

    async fn get_course(&self, name: &str) -> Result<Course, BackendError> {
        match name {
            "secure-coding-101" => Ok(course(name)),
            "blocking-course" => std::future::pending().await,
            _ => Err(BackendError::Status {
                status: 404,
                url: format!("http://backend.test/courses/{name}"),
                body: "course not found".to_string(),
            }),
        }
    }

    async fn create_order(&self, _order: &NewOrder) -> Result<Order, BackendError> {
        Err(BackendError::Status {
            status: 503,
            url: "http://backend.test/orders".to_string(),
            body: "orders disabled".to_string(),
        })
    }

    async fn get_order(&self, id: &str) -> Result<Order, BackendError> {
        Err(BackendError::Status {
            status: 404,
            url: format!("http://backend.test/orders/{id}"),
            body: "order not found".to_string(),
        })
    }

    fn payment_url(&self, order_id: &str) -> String {
        format!("http://backend.test/orders/{order_id}/payment")
    }
}

pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, BackendError> {
        Ok(vec![1.0, 0.0])
    }
}

pub struct FakeVectorStore;

#[async_trait]
impl VectorStore for FakeVectorStore {
    async fn query_content(
        &self,
        _embedding: &[f32],
        _threshold: f64,
        _limit: usize,
    ) -> Result<Vec<ContentMatch>, BackendError> {
        Ok(vec![ContentMatch {
            content: "Always parameterize SQL queries.".to_string(),
            similarity: 0.9,
        }])
    }
}

pub fn fake_backends() -> Backends {
    Backends {
        catalog: Arc::new(FakeCatalog),
        embedder: Arc::new(FakeEmbedder),
        vector_store: Arc::new(FakeVectorStore),
        similarity_threshold: 0.0,
    }
}

/// What the relay did to the live leg's write side.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Sent(LiveClientMessage),
    Closed,
}

pub struct RecordingSink {
    events: mpsc::UnboundedSender<SinkEvent>,
}

#[async_trait]
impl LiveSink for RecordingSink {
    async fn send(&mut self, message: &LiveClientMessage) -> Result<(), LiveError> {
        let _ = self.events.send(SinkEvent::Sent(message.clone()));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LiveError> {
        let _ = self.events.send(SinkEvent::Closed);
        Ok(())
    }
}

/// Replays whatever the test pushes; a dropped sender reads as a normal close.
pub struct ScriptedSource {
    messages: mpsc::UnboundedReceiver<Result<LiveServerMessage, LiveError>>,
}

#[async_trait]
impl LiveSource for ScriptedSource {
    async fn receive(&mut self) -> Result<Option<LiveServerMessage>, LiveError> {
        match self.messages.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

pub struct FakeLive {
    pub server: mpsc::UnboundedSender<Result<LiveServerMessage, LiveError>>,
    pub events: mpsc::UnboundedReceiver<SinkEvent>,
}

impl FakeLive {
    pub fn new() -> (Self, (RecordingSink, ScriptedSource)) {
        let (server, messages) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        (
            Self { server, events },
            (
                RecordingSink { events: events_tx },
                ScriptedSource { messages },
            ),
        )
    }

    pub fn push(&self, json: &str) {
        let message = LiveServerMessage::parse(json).unwrap();
        self.server.send(Ok(message)).unwrap();
    }
}
