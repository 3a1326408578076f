//! Validation, authorization and concurrent dispatch of model-requested
//! function calls.

use std::sync::Arc;

use futures::future::join_all;
use llm_service::ToolSpec;
use semantic_search::{SearchFilters, SemanticSearch};
use shop_store::{FunctionCall, FunctionOutcome, FunctionResult, Locale, OrderRepo, ProductRepo};
use tracing::{debug, warn};

use crate::error::FunctionError;
use crate::format;
use crate::registry::{FunctionSpec, builtin_functions};

const DEFAULT_RESULT_LIMIT: usize = 5;
const KNOWLEDGE_LIMIT: usize = 3;
const SEARCH_THRESHOLD: f32 = 0.3;
const KNOWLEDGE_THRESHOLD: f32 = 0.25;

/// Who is on the other end of the conversation.
#[derive(Clone, Debug, Default)]
pub struct Identity {
    pub customer_id: Option<String>,
}

impl Identity {
    pub fn guest() -> Self {
        Self { customer_id: None }
    }

    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(id.into()),
        }
    }
}

/// Routes validated function calls to search and storage, producing the
/// formatted text results the model grounds its answer in.
pub struct FunctionOrchestrator {
    functions: Vec<FunctionSpec>,
    search: Arc<SemanticSearch>,
    products: Arc<dyn ProductRepo>,
    orders: Arc<dyn OrderRepo>,
}

impl FunctionOrchestrator {
    pub fn new(
        search: Arc<SemanticSearch>,
        products: Arc<dyn ProductRepo>,
        orders: Arc<dyn OrderRepo>,
    ) -> Self {
        Self {
            functions: builtin_functions(),
            search,
            products,
            orders,
        }
    }

    /// Tool descriptions for the generation request.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.functions.iter().map(FunctionSpec::to_tool_spec).collect()
    }

    /// Runs every call concurrently. A failing call becomes an error-shaped
    /// result; it never poisons its siblings or the turn.
    pub async fn execute_all(
        &self,
        calls: &[FunctionCall],
        identity: &Identity,
        locale: Locale,
    ) -> Vec<FunctionResult> {
        let futures = calls.iter().map(|call| async move {
            let outcome = match self.execute(call, identity, locale).await {
                Ok(text) => FunctionOutcome::Ok(text),
                Err(e) => {
                    warn!(target: "assistant::dispatch", name = %call.name, "function failed: {e}");
                    FunctionOutcome::Error(user_facing_error(&e))
                }
            };
            FunctionResult {
                name: call.name.clone(),
                outcome,
            }
        });
        join_all(futures).await
    }

    async fn execute(
        &self,
        call: &FunctionCall,
        identity: &Identity,
        locale: Locale,
    ) -> Result<String, FunctionError> {
        let spec = self
            .functions
            .iter()
            .find(|f| f.name == call.name)
            .ok_or_else(|| FunctionError::UnknownFunction(call.name.clone()))?;
        spec.validate(call)?;
        if spec.requires_auth && identity.customer_id.is_none() {
            return Err(FunctionError::Unauthorized(call.name.clone()));
        }
        debug!(target: "assistant::dispatch", name = %call.name, "dispatching function");

        match call.name.as_str() {
            "search_products" => self.search_products(call, locale).await,
            "search_knowledge" => {
                let query = str_arg(call, "query")?;
                let matches = self
                    .search
                    .search_knowledge(query, locale, KNOWLEDGE_LIMIT, KNOWLEDGE_THRESHOLD)
                    .await;
                Ok(format::knowledge_list(&matches, query, locale))
            }
            "find_similar_products" => {
                let id = str_arg(call, "product_id")?;
                let matches = self
                    .search
                    .find_similar_to(id, locale, DEFAULT_RESULT_LIMIT)
                    .await;
                Ok(format::product_list(&matches, id, locale))
            }
            "compare_products" => {
                let ids = str_list_arg(call, "product_ids")?;
                let products = self
                    .products
                    .get_many(&ids)
                    .await
                    .map_err(|e| FunctionError::Backend(e.to_string()))?;
                Ok(format::comparison(&products, locale))
            }
            "check_stock" => {
                let id = str_arg(call, "product_id")?;
                match self
                    .products
                    .get(id)
                    .await
                    .map_err(|e| FunctionError::Backend(e.to_string()))?
                {
                    Some(product) => Ok(format::stock(&product, locale)),
                    None => Ok(format!("No product found with id \"{id}\".")),
                }
            }
            "get_quote" => {
                let id = str_arg(call, "product_id")?;
                let quantity = int_arg(call, "quantity")?;
                if quantity == 0 {
                    return Err(FunctionError::InvalidArguments(
                        "get_quote: quantity must be at least 1".into(),
                    ));
                }
                match self
                    .products
                    .get(id)
                    .await
                    .map_err(|e| FunctionError::Backend(e.to_string()))?
                {
                    Some(product) => Ok(format::quote(&product, quantity, locale)),
                    None => Ok(format!("No product found with id \"{id}\".")),
                }
            }
            "get_order_history" => {
                // requires_auth guarantees a customer id at this point.
                let customer = identity
                    .customer_id
                    .as_deref()
                    .ok_or_else(|| FunctionError::Unauthorized(call.name.clone()))?;
                let limit = opt_int_arg(call, "limit").unwrap_or(DEFAULT_RESULT_LIMIT as u32);
                let orders = self
                    .orders
                    .list_for_customer(customer, limit as usize)
                    .await
                    .map_err(|e| FunctionError::Backend(e.to_string()))?;
                Ok(format::order_list(&orders))
            }
            other => Err(FunctionError::UnknownFunction(other.to_string())),
        }
    }

    async fn search_products(
        &self,
        call: &FunctionCall,
        locale: Locale,
    ) -> Result<String, FunctionError> {
        let query = str_arg(call, "query")?;
        let limit = opt_int_arg(call, "limit").unwrap_or(DEFAULT_RESULT_LIMIT as u32) as usize;

        let filters = SearchFilters {
            category: opt_str_arg(call, "category").map(str::to_string),
            brand: opt_str_arg(call, "brand").map(str::to_string),
            price_min: opt_f64_arg(call, "price_min"),
            price_max: opt_f64_arg(call, "price_max"),
            in_stock_only: opt_bool_arg(call, "in_stock_only").unwrap_or(false),
        };

        // Unfiltered queries go through the hybrid path so exact SKUs and
        // model names survive a weak vector match.
        let matches = if filters.is_empty() {
            self.search.hybrid_search(query, locale, limit).await
        } else {
            self.search
                .search(query, locale, limit, SEARCH_THRESHOLD, &filters)
                .await
        };
        Ok(format::product_list(&matches, query, locale))
    }
}

/// Errors become text the model can relay; the unauthorized case carries the
/// exact next step for the user.
fn user_facing_error(e: &FunctionError) -> String {
    match e {
        FunctionError::Unauthorized(_) => {
            "Please sign in to view your order history.".to_string()
        }
        other => other.to_string(),
    }
}

fn str_arg<'a>(call: &'a FunctionCall, name: &str) -> Result<&'a str, FunctionError> {
    opt_str_arg(call, name).ok_or_else(|| {
        FunctionError::InvalidArguments(format!("{}: missing argument '{name}'", call.name))
    })
}

fn opt_str_arg<'a>(call: &'a FunctionCall, name: &str) -> Option<&'a str> {
    call.arguments.get(name).and_then(|v| v.as_str())
}

fn opt_f64_arg(call: &FunctionCall, name: &str) -> Option<f64> {
    call.arguments.get(name).and_then(|v| v.as_f64())
}

fn opt_bool_arg(call: &FunctionCall, name: &str) -> Option<bool> {
    call.arguments.get(name).and_then(|v| v.as_bool())
}

fn opt_int_arg(call: &FunctionCall, name: &str) -> Option<u32> {
    call.arguments
        .get(name)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

fn int_arg(call: &FunctionCall, name: &str) -> Result<u32, FunctionError> {
    opt_int_arg(call, name).ok_or_else(|| {
        FunctionError::InvalidArguments(format!("{}: missing argument '{name}'", call.name))
    })
}

fn str_list_arg(call: &FunctionCall, name: &str) -> Result<Vec<String>, FunctionError> {
    let items = call
        .arguments
        .get(name)
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            FunctionError::InvalidArguments(format!("{}: missing argument '{name}'", call.name))
        })?;
    Ok(items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect())
}
