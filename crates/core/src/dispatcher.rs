//! Resolves tool calls from the live session against the backends.

use crate::{
    arguments::ToolRequest,
    catalog::{CatalogClient, NewOrder},
    content::{Embedder, MAX_CONTENT_RESULTS, VectorStore, rank_matches},
    error::{BackendError, ToolError},
    registry::ToolRegistry,
};
use gemini_realtime::{FunctionCall, FunctionResponse};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// One function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl From<FunctionCall> for ToolInvocation {
    fn from(call: FunctionCall) -> Self {
        Self {
            id: call.id,
            name: call.name,
            arguments: call.args,
        }
    }
}

impl From<&FunctionCall> for ToolInvocation {
    fn from(call: &FunctionCall) -> Self {
        call.clone().into()
    }
}

/// The result of one invocation, echoing its name and id.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub id: Option<String>,
    pub name: String,
    pub result: Map<String, Value>,
}

impl From<ToolResponse> for FunctionResponse {
    fn from(response: ToolResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            response: response.result,
        }
    }
}

/// Shared backend handles. Each is stateless per call.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogClient>,
    pub embedder: Arc<dyn Embedder>,
    pub vector_store: Arc<dyn VectorStore>,
    pub similarity_threshold: f64,
}

/// Maps invocations to backend operations for the tools of one registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    backends: Backends,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, backends: Backends) -> Self {
        Self { registry, backends }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolves a single invocation.
    ///
    /// Tools outside this dispatcher's registry are unknown even when a
    /// handler for them exists. Arguments are validated before any backend
    /// call is made.
    pub async fn resolve(&self, invocation: &ToolInvocation) -> Result<ToolResponse, ToolError> {
        if !self.registry.contains(&invocation.name) {
            return Err(ToolError::UnknownTool(invocation.name.clone()));
        }
        let request = ToolRequest::parse(&invocation.name, &invocation.arguments)?;
        debug!(tool = %invocation.name, call_id = ?invocation.id, "Resolving tool call.");

        let result = self
            .execute(request)
            .await
            .map_err(|source| ToolError::Backend {
                tool: invocation.name.clone(),
                source,
            })?;

        Ok(ToolResponse {
            id: invocation.id.clone(),
            name: invocation.name.clone(),
            result,
        })
    }

    /// Resolves a batch in arrival order. The first failure aborts the batch.
    pub async fn resolve_batch(
        &self,
        invocations: &[ToolInvocation],
    ) -> Result<Vec<ToolResponse>, ToolError> {
        let mut responses = Vec::with_capacity(invocations.len());
        for invocation in invocations {
            responses.push(self.resolve(invocation).await?);
        }
        Ok(responses)
    }

    async fn execute(&self, request: ToolRequest) -> Result<Map<String, Value>, BackendError> {
        let catalog = &self.backends.catalog;
        match request {
            ToolRequest::ListCourses => {
                let courses = catalog.list_courses().await?;
                Ok(object([("courses", serde_json::to_value(courses)?)]))
            }
            ToolRequest::GetCourse(args) => {
                let course = catalog.get_course(&args.course).await?;
                Ok(object([("course", serde_json::to_value(course)?)]))
            }
            ToolRequest::CreateOrder(args) => {
                let order = catalog
                    .create_order(&NewOrder {
                        course: args.course,
                        user_name: args.user_name,
                        user_email: args.user_email,
                    })
                    .await?;
                let payment_url = catalog.payment_url(&order.id);
                info!(order_id = %order.id, %payment_url, "Created order.");
                Ok(object([
                    ("order", serde_json::to_value(order)?),
                    ("payment_url", Value::String(payment_url)),
                ]))
            }
            ToolRequest::GetOrder(args) => {
                let order = catalog.get_order(&args.order_number).await?;
                Ok(object([("order", serde_json::to_value(order)?)]))
            }
            ToolRequest::SearchCourseContent(args) => {
                let threshold = self.backends.similarity_threshold;
                let embedding = self.backends.embedder.embed(&args.query).await?;
                let candidates = self
                    .backends
                    .vector_store
                    .query_content(&embedding, threshold, MAX_CONTENT_RESULTS)
                    .await?;
                let contents: Vec<String> =
                    rank_matches(candidates, threshold, MAX_CONTENT_RESULTS)
                        .into_iter()
                        .map(|m| m.content)
                        .collect();
                debug!(results = contents.len(), "Searched course content.");
                Ok(object([("contents", serde_json::to_value(contents)?)]))
            }
        }
    }
}

fn object<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}
