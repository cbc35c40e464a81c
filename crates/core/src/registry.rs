//! The tools advertised to a live session.

use crate::arguments::{
    CREATE_ORDER, CreateOrderArgs, GET_COURSE, GET_ORDER, GetCourseArgs, GetOrderArgs,
    LIST_COURSES, SEARCH_COURSE_CONTENT, SearchCourseContentArgs,
};
use gemini_realtime::{FunctionDeclaration, Schema, SchemaType, Tool};
use schemars::JsonSchema;
use serde_json::Value;

pub type ToolDeclaration = FunctionDeclaration;

/// Ordered, immutable set of tool declarations. Built once at startup and
/// shared by every session of an agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolRegistry {
    declarations: Vec<ToolDeclaration>,
}

impl ToolRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Tools of the course sales assistant.
    pub fn course_agent() -> Self {
        Self {
            declarations: vec![
                declare::<SearchCourseContentArgs>(
                    SEARCH_COURSE_CONTENT,
                    "Explain about software security course materials.",
                ),
                ToolDeclaration {
                    name: LIST_COURSES.to_string(),
                    description: "List all available courses sold on the platform.".to_string(),
                    parameters: None,
                },
                declare::<GetCourseArgs>(
                    GET_COURSE,
                    "Get course details by course name. course name is the unique identifier of the course. it typically contains the course title with dashes. This function can be used to get course details such as course price, etc.",
                ),
                declare::<CreateOrderArgs>(
                    CREATE_ORDER,
                    "Create order for a course. This function can be used to create an order for a course. When this function returns successfully, it will return payment url to user to make payment.",
                ),
                declare::<GetOrderArgs>(
                    GET_ORDER,
                    "Get order by using order number. This function can be used to get order details such as payment status to check whether the order has been paid or not. If user already paid the course, say thanks",
                ),
            ],
        }
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.declarations
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declarations.iter().map(|d| d.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// The `tools` entry of a session setup. Empty when there is nothing to declare.
    pub fn to_tools(&self) -> Vec<Tool> {
        if self.declarations.is_empty() {
            return Vec::new();
        }
        vec![Tool {
            function_declarations: self.declarations.clone(),
        }]
    }
}

fn declare<T: JsonSchema>(name: &str, description: &str) -> ToolDeclaration {
    let mut parameters = to_live_schema(schemars::schema_for!(T).as_value());
    if let Some(schema) = parameters.as_mut() {
        // The struct's own doc comment is not part of the tool contract.
        schema.description = None;
    }
    ToolDeclaration {
        name: name.to_string(),
        description: description.to_string(),
        parameters,
    }
}

/// Translates a generated JSON schema into the live protocol's schema dialect.
fn to_live_schema(value: &Value) -> Option<Schema> {
    let schema_type = SchemaType::from_json_schema(value.get("type")?.as_str()?)?;
    let properties = value
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .filter_map(|(name, property)| {
                    to_live_schema(property).map(|schema| (name.clone(), schema))
                })
                .collect()
        })
        .unwrap_or_default();
    let required = value
        .get("required")
        .and_then(Value::as_array)
        .map(|names| {
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Schema {
        schema_type,
        description: value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string),
        properties,
        required,
    })
}
