//! Typed arguments for each tool.
//!
//! The live session hands us an untyped JSON object per call. Each tool's
//! arguments are converted into a typed struct before any backend is touched,
//! and the same structs describe the parameter schema advertised to the model.

use crate::error::ToolError;
use schemars::JsonSchema;
use serde_json::{Map, Value};

pub const SEARCH_COURSE_CONTENT: &str = "search_course_content";
pub const LIST_COURSES: &str = "list_courses";
pub const GET_COURSE: &str = "get_course";
pub const CREATE_ORDER: &str = "create_order";
pub const GET_ORDER: &str = "get_order";

#[derive(JsonSchema, Debug, Clone, PartialEq)]
pub struct SearchCourseContentArgs {
    /// search query to search course content.
    pub query: String,
}

#[derive(JsonSchema, Debug, Clone, PartialEq)]
pub struct GetCourseArgs {
    /// name of the course. this is the unique identifier of the course. it typically contains the course title with dashes, all in lowercase.
    pub course: String,
}

#[derive(JsonSchema, Debug, Clone, PartialEq)]
pub struct CreateOrderArgs {
    /// name of the course. this is the unique identifier of the course. it typically contains the course title with dashes, all in lowercase.
    pub course: String,
    /// name of the user who is purchasing the course.
    pub user_name: String,
    /// email of the user who is purchasing the course.
    pub user_email: String,
}

#[derive(JsonSchema, Debug, Clone, PartialEq)]
pub struct GetOrderArgs {
    /// order number identifier. this is a unique identifier in uuid format.
    pub order_number: String,
}

/// Conversion from a call's argument object into a typed argument struct.
pub trait FromArguments: Sized {
    fn from_arguments(tool: &str, args: &Map<String, Value>) -> Result<Self, ToolError>;
}

impl FromArguments for SearchCourseContentArgs {
    fn from_arguments(tool: &str, args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            query: required_str(tool, args, "query")?,
        })
    }
}

impl FromArguments for GetCourseArgs {
    fn from_arguments(tool: &str, args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            course: required_str(tool, args, "course")?,
        })
    }
}

impl FromArguments for CreateOrderArgs {
    fn from_arguments(tool: &str, args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            course: required_str(tool, args, "course")?,
            user_name: required_str(tool, args, "user_name")?,
            user_email: required_str(tool, args, "user_email")?,
        })
    }
}

impl FromArguments for GetOrderArgs {
    fn from_arguments(tool: &str, args: &Map<String, Value>) -> Result<Self, ToolError> {
        Ok(Self {
            order_number: required_str(tool, args, "order_number")?,
        })
    }
}

/// A required string argument. `null` counts as absent.
pub fn required_str(
    tool: &str,
    args: &Map<String, Value>,
    argument: &str,
) -> Result<String, ToolError> {
    match args.get(argument) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument {
            tool: tool.to_string(),
            argument: argument.to_string(),
        }),
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(ToolError::InvalidArgument {
            tool: tool.to_string(),
            argument: argument.to_string(),
            expected: "a string",
            found: json_kind(other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A validated tool call, ready to be executed against the backends.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    SearchCourseContent(SearchCourseContentArgs),
    ListCourses,
    GetCourse(GetCourseArgs),
    CreateOrder(CreateOrderArgs),
    GetOrder(GetOrderArgs),
}

impl ToolRequest {
    pub fn parse(name: &str, args: &Map<String, Value>) -> Result<Self, ToolError> {
        match name {
            SEARCH_COURSE_CONTENT => Ok(Self::SearchCourseContent(
                SearchCourseContentArgs::from_arguments(name, args)?,
            )),
            LIST_COURSES => Ok(Self::ListCourses),
            GET_COURSE => Ok(Self::GetCourse(GetCourseArgs::from_arguments(name, args)?)),
            CREATE_ORDER => Ok(Self::CreateOrder(CreateOrderArgs::from_arguments(
                name, args,
            )?)),
            GET_ORDER => Ok(Self::GetOrder(GetOrderArgs::from_arguments(name, args)?)),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::SearchCourseContent(_) => SEARCH_COURSE_CONTENT,
            Self::ListCourses => LIST_COURSES,
            Self::GetCourse(_) => GET_COURSE,
            Self::CreateOrder(_) => CREATE_ORDER,
            Self::GetOrder(_) => GET_ORDER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn test_parse_create_order() {
        let request = ToolRequest::parse(
            CREATE_ORDER,
            &args(json!({
                "course": "secure-coding-101",
                "user_name": "Jane Doe",
                "user_email": "jane@example.com",
                "extra": 1
            })),
        )
        .unwrap();

        assert_eq!(
            request,
            ToolRequest::CreateOrder(CreateOrderArgs {
                course: "secure-coding-101".to_string(),
                user_name: "Jane Doe".to_string(),
                user_email: "jane@example.com".to_string(),
            })
        );
        assert_eq!(request.tool_name(), CREATE_ORDER);
    }

    #[test]
    fn test_list_courses_ignores_arguments() {
        let request = ToolRequest::parse(LIST_COURSES, &args(json!({ "page": 2 }))).unwrap();
        assert_eq!(request, ToolRequest::ListCourses);
    }

    #[test]
    fn test_missing_and_null_arguments() {
        let err = ToolRequest::parse(
            CREATE_ORDER,
            &args(json!({ "course": "secure-coding-101", "user_name": "Jane Doe" })),
        )
        .unwrap_err();
        assert!(err.is_invalid_arguments());
        match err {
            ToolError::MissingArgument { tool, argument } => {
                assert_eq!(tool, CREATE_ORDER);
                assert_eq!(argument, "user_email");
            }
            other => panic!("expected missing argument, got {other:?}"),
        }

        let err = ToolRequest::parse(GET_ORDER, &args(json!({ "order_number": null }))).unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument { .. }));
    }

    #[test]
    fn test_wrong_type_is_invalid_argument() {
        let err = ToolRequest::parse(GET_COURSE, &args(json!({ "course": 42 }))).unwrap_err();

        assert!(err.is_invalid_arguments());
        match err {
            ToolError::InvalidArgument {
                argument,
                expected,
                found,
                ..
            } => {
                assert_eq!(argument, "course");
                assert_eq!(expected, "a string");
                assert_eq!(found, "a number");
            }
            other => panic!("expected invalid argument, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tool() {
        let err = ToolRequest::parse("delete_course", &Map::new()).unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(ref name) if name == "delete_course"));
        assert!(!err.is_invalid_arguments());
    }
}
