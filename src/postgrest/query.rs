//! Query builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::ClientOptions;
use crate::error::Error;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::*;
use crate::postgrest::types::*;

/// Everything a builder needs to issue its request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Endpoint URL (table or rpc)
    pub url: String,

    /// The API key, sent both as `apikey` and as bearer token
    pub key: String,

    /// HTTP client
    pub client: Client,

    pub options: ClientOptions,
}

impl RequestContext {
    fn decorate<'a>(&self, fetch: FetchBuilder<'a>) -> FetchBuilder<'a> {
        fetch
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header("X-Client-Info", &self.options.client_info)
            .header("Accept-Profile", &self.options.db_schema)
            .header("Content-Profile", &self.options.db_schema)
            .timeout(self.options.request_timeout)
    }
}

/// Base query builder; parameters keep insertion order and may repeat
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter to the query
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Replace every occurrence of a parameter
    pub fn set_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.add_param(key, value);
    }

    pub fn add_filter(&mut self, column: &str, op: FilterOperator, value: &str) {
        self.add_param(column, &op.apply(value));
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    ctx: RequestContext,
    query: QueryBuilder,
    count: Option<CountOption>,
}

impl SelectBuilder {
    /// Create a new SelectBuilder
    pub fn new(ctx: RequestContext, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);

        Self {
            ctx,
            query,
            count: None,
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Eq, &value.to_string());
        self
    }

    /// Filter rows where column is greater than or equal to a value
    pub fn gte<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Gte, &value.to_string());
        self
    }

    /// Filter rows where column is less than or equal to a value
    pub fn lte<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Lte, &value.to_string());
        self
    }

    /// Filter rows where column matches a pattern (case insensitive)
    pub fn ilike(&mut self, column: &str, pattern: &str) -> &mut Self {
        self.query.add_filter(column, FilterOperator::ILike, pattern);
        self
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<T: ToString>(&mut self, column: &str, values: &[T]) -> &mut Self {
        let values_str: Vec<String> = values
            .iter()
            .map(|v| quote_list_value(&v.to_string()))
            .collect();
        self.query
            .add_filter(column, FilterOperator::In, &format!("({})", values_str.join(",")));
        self
    }

    /// Rows matching any of the given `column.op.value` conditions
    pub fn or(&mut self, conditions: &[String]) -> &mut Self {
        self.query
            .add_param("or", &format!("({})", conditions.join(",")));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(&mut self, count: u32) -> &mut Self {
        self.query.set_param("limit", &count.to_string());
        self
    }

    /// Skip a number of rows
    pub fn offset(&mut self, count: u32) -> &mut Self {
        self.query.set_param("offset", &count.to_string());
        self
    }

    /// Order the results by a column
    pub fn order(&mut self, column: &str, ascending: bool) -> &mut Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query
            .set_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Order with NULLs after every other value
    pub fn order_nulls_last(&mut self, column: &str, ascending: bool) -> &mut Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query
            .set_param("order", &format!("{}.{}.nullslast", column, direction));
        self
    }

    /// Ask PostgREST for the total number of matching rows
    pub fn count(&mut self, option: CountOption) -> &mut Self {
        self.count = Some(option);
        self
    }

    fn fetch(&self) -> FetchBuilder<'_> {
        let mut fetch = self
            .ctx
            .decorate(Fetch::get(&self.ctx.client, &self.ctx.url))
            .query(self.query.get_params());

        if let Some(count) = self.count {
            fetch = fetch.header("Prefer", &format!("count={}", count.as_str()));
        }

        fetch
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>, Error> {
        self.fetch().execute::<Vec<T>>().await
    }

    /// Execute the query and return the results with the total row count
    pub async fn execute_with_count<T: DeserializeOwned>(
        &self,
    ) -> Result<(Vec<T>, Option<u64>), Error> {
        let (rows, headers) = self.fetch().execute_with_headers::<Vec<T>>().await?;

        let total = headers
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        Ok((rows, total))
    }

    /// Execute the query and return the first row
    pub async fn execute_one<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        self.limit(1);

        let results = self.execute::<T>().await?;
        Ok(results.into_iter().next())
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    ctx: RequestContext,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    /// Create a new InsertBuilder
    pub fn new(ctx: RequestContext, values: T) -> Self {
        Self { ctx, values }
    }

    /// Execute the query and return the inserted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        self.ctx
            .decorate(Fetch::post(&self.ctx.client, &self.ctx.url))
            .header(
                "Prefer",
                &format!("return={}", ReturnOption::Representation.as_str()),
            )
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }

    /// Execute the query without returning the inserted data
    pub async fn execute_no_return(&self) -> Result<(), Error> {
        self.ctx
            .decorate(Fetch::post(&self.ctx.client, &self.ctx.url))
            .header("Prefer", &format!("return={}", ReturnOption::Minimal.as_str()))
            .json(&self.values)?
            .execute_empty()
            .await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    ctx: RequestContext,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    /// Create a new UpdateBuilder
    pub fn new(ctx: RequestContext, values: T) -> Self {
        Self {
            ctx,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Eq, &value.to_string());
        self
    }

    /// Execute the query and return the updated rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        if self.query.get_params().is_empty() {
            return Err(Error::general("refusing to update without a filter"));
        }

        self.ctx
            .decorate(Fetch::patch(&self.ctx.client, &self.ctx.url))
            .header(
                "Prefer",
                &format!("return={}", ReturnOption::Representation.as_str()),
            )
            .query(self.query.get_params())
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    ctx: RequestContext,
    query: QueryBuilder,
}

impl DeleteBuilder {
    /// Create a new DeleteBuilder
    pub fn new(ctx: RequestContext) -> Self {
        Self {
            ctx,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query
            .add_filter(column, FilterOperator::Eq, &value.to_string());
        self
    }

    /// Execute the query and return the deleted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>, Error> {
        if self.query.get_params().is_empty() {
            return Err(Error::general("refusing to delete without a filter"));
        }

        self.ctx
            .decorate(Fetch::delete(&self.ctx.client, &self.ctx.url))
            .header(
                "Prefer",
                &format!("return={}", ReturnOption::Representation.as_str()),
            )
            .query(self.query.get_params())
            .execute::<Vec<R>>()
            .await
    }
}

/// Builder for RPC (stored procedure) calls
pub struct RpcBuilder<T: Serialize> {
    ctx: RequestContext,
    params: T,
}

impl<T: Serialize> RpcBuilder<T> {
    /// Create a new RpcBuilder
    pub fn new(ctx: RequestContext, params: T) -> Self {
        Self { ctx, params }
    }

    /// Execute the RPC call and return the results
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<R, Error> {
        self.ctx
            .decorate(Fetch::post(&self.ctx.client, &self.ctx.url))
            .json(&self.params)?
            .execute::<R>()
            .await
    }
}
