//! The function registry: every capability the model may call, with enough
//! schema to validate arguments before anything executes.

use llm_service::ToolSpec;
use serde_json::{Map, Value, json};
use shop_store::FunctionCall;

use crate::error::FunctionError;

/// Argument types the registry can validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Number,
    Integer,
    Bool,
    StrList,
}

impl ArgKind {
    fn json_type(self) -> &'static str {
        match self {
            ArgKind::Str => "string",
            ArgKind::Number => "number",
            ArgKind::Integer => "integer",
            ArgKind::Bool => "boolean",
            ArgKind::StrList => "array",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ArgKind::Str => value.is_string(),
            ArgKind::Number => value.is_number(),
            ArgKind::Integer => value.is_i64() || value.is_u64(),
            ArgKind::Bool => value.is_boolean(),
            ArgKind::StrList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
    pub description: &'static str,
}

/// One callable function: name, argument schema, auth requirement.
#[derive(Clone, Debug)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub args: Vec<ArgSpec>,
    pub requires_auth: bool,
}

impl FunctionSpec {
    /// The JSON-schema tool description handed to the model.
    pub fn to_tool_spec(&self) -> ToolSpec {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for arg in &self.args {
            let mut schema = json!({
                "type": arg.kind.json_type(),
                "description": arg.description,
            });
            if arg.kind == ArgKind::StrList {
                schema["items"] = json!({ "type": "string" });
            }
            properties.insert(arg.name.to_string(), schema);
            if arg.required {
                required.push(Value::String(arg.name.to_string()));
            }
        }
        ToolSpec {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Checks `call.arguments` against this spec.
    pub fn validate(&self, call: &FunctionCall) -> Result<(), FunctionError> {
        for arg in &self.args {
            match call.arguments.get(arg.name) {
                Some(value) if !arg.kind.accepts(value) => {
                    return Err(FunctionError::InvalidArguments(format!(
                        "{}: argument '{}' must be a {}",
                        self.name,
                        arg.name,
                        arg.kind.json_type()
                    )));
                }
                None if arg.required => {
                    return Err(FunctionError::InvalidArguments(format!(
                        "{}: missing required argument '{}'",
                        self.name, arg.name
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// The fixed set of storefront functions.
pub fn builtin_functions() -> Vec<FunctionSpec> {
    vec![
        FunctionSpec {
            name: "search_products",
            description: "Search the product catalog by meaning, with optional structured filters.",
            args: vec![
                ArgSpec {
                    name: "query",
                    kind: ArgKind::Str,
                    required: true,
                    description: "What the customer is looking for, in their own words.",
                },
                ArgSpec {
                    name: "category",
                    kind: ArgKind::Str,
                    required: false,
                    description: "Restrict results to one category.",
                },
                ArgSpec {
                    name: "brand",
                    kind: ArgKind::Str,
                    required: false,
                    description: "Restrict results to one brand.",
                },
                ArgSpec {
                    name: "price_min",
                    kind: ArgKind::Number,
                    required: false,
                    description: "Lowest acceptable price.",
                },
                ArgSpec {
                    name: "price_max",
                    kind: ArgKind::Number,
                    required: false,
                    description: "Highest acceptable price.",
                },
                ArgSpec {
                    name: "in_stock_only",
                    kind: ArgKind::Bool,
                    required: false,
                    description: "Only show products available right now.",
                },
                ArgSpec {
                    name: "limit",
                    kind: ArgKind::Integer,
                    required: false,
                    description: "Maximum number of results, default 5.",
                },
            ],
            requires_auth: false,
        },
        FunctionSpec {
            name: "search_knowledge",
            description: "Search help articles: shipping, returns, warranty and other policies.",
            args: vec![ArgSpec {
                name: "query",
                kind: ArgKind::Str,
                required: true,
                description: "The policy question to look up.",
            }],
            requires_auth: false,
        },
        FunctionSpec {
            name: "find_similar_products",
            description: "Find products similar to one the customer is viewing.",
            args: vec![ArgSpec {
                name: "product_id",
                kind: ArgKind::Str,
                required: true,
                description: "Id of the reference product.",
            }],
            requires_auth: false,
        },
        FunctionSpec {
            name: "compare_products",
            description: "Compare several products side by side.",
            args: vec![ArgSpec {
                name: "product_ids",
                kind: ArgKind::StrList,
                required: true,
                description: "Ids of the products to compare, two or more.",
            }],
            requires_auth: false,
        },
        FunctionSpec {
            name: "check_stock",
            description: "Check current availability of one product.",
            args: vec![ArgSpec {
                name: "product_id",
                kind: ArgKind::Str,
                required: true,
                description: "Id of the product to check.",
            }],
            requires_auth: false,
        },
        FunctionSpec {
            name: "get_quote",
            description: "Price a quantity of one product.",
            args: vec![
                ArgSpec {
                    name: "product_id",
                    kind: ArgKind::Str,
                    required: true,
                    description: "Id of the product to quote.",
                },
                ArgSpec {
                    name: "quantity",
                    kind: ArgKind::Integer,
                    required: true,
                    description: "Number of units.",
                },
            ],
            requires_auth: false,
        },
        FunctionSpec {
            name: "get_order_history",
            description: "List the signed-in customer's recent orders.",
            args: vec![ArgSpec {
                name: "limit",
                kind: ArgKind::Integer,
                required: false,
                description: "Maximum number of orders, default 5.",
            }],
            requires_auth: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn call(name: &str, args: Value) -> FunctionCall {
        FunctionCall {
            name: name.to_string(),
            arguments: args.as_object().cloned().unwrap_or_default(),
        }
    }

    fn spec(name: &str) -> FunctionSpec {
        builtin_functions()
            .into_iter()
            .find(|f| f.name == name)
            .unwrap()
    }

    #[test]
    fn tool_spec_carries_required_fields() {
        let tool = spec("get_quote").to_tool_spec();
        assert_eq!(tool.name, "get_quote");
        assert_eq!(
            tool.parameters["required"],
            json!(["product_id", "quantity"])
        );
        assert_eq!(
            tool.parameters["properties"]["quantity"]["type"],
            json!("integer")
        );
    }

    #[test]
    fn string_list_schema_declares_item_type() {
        let tool = spec("compare_products").to_tool_spec();
        assert_eq!(
            tool.parameters["properties"]["product_ids"]["items"]["type"],
            json!("string")
        );
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        let err = spec("search_products")
            .validate(&call("search_products", json!({})))
            .unwrap_err();
        assert!(matches!(err, FunctionError::InvalidArguments(_)));
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn wrong_argument_type_is_rejected() {
        let err = spec("get_quote")
            .validate(&call(
                "get_quote",
                json!({ "product_id": "p1", "quantity": "three" }),
            ))
            .unwrap_err();
        assert!(matches!(err, FunctionError::InvalidArguments(_)));
    }

    #[test]
    fn optional_arguments_may_be_absent() {
        spec("search_products")
            .validate(&call("search_products", json!({ "query": "pipes" })))
            .unwrap();
        spec("get_order_history")
            .validate(&call("get_order_history", json!({})))
            .unwrap();
    }

    #[test]
    fn only_order_history_requires_auth() {
        let protected: Vec<&str> = builtin_functions()
            .iter()
            .filter(|f| f.requires_auth)
            .map(|f| f.name)
            .collect();
        assert_eq!(protected, vec!["get_order_history"]);
    }
}
