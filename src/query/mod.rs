//! Declarative, immutable query builder.
//!
//! A [`Query`] is a pure value: every modifier clones and returns a new query,
//! and nothing is compiled until an execution method turns it into a
//! [`Command`](crate::api::Command). Set-valued modifiers (`select`,
//! `exclude_keys`, `include`, `fields`, `watch`) union across calls, so
//! `.include(&["a"]).include(&["b"])` equals `.include(&["a", "b"])`.

mod constraint;

pub use constraint::{
    and, contained_in, contains_all, eq, exists, gt, gte, lt, lte, matches_regex, ne,
    not_contained_in, or, related_to, Constraint,
};

use std::collections::BTreeSet;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::api::{Command, Method, RequestOption, RequestOptions};
use crate::client::Client;
use crate::codec::{self, QueryResponse};
use crate::error::{Error, Result};
use crate::object::Record;

use constraint::fold_constraints;

pub const DEFAULT_LIMIT: i64 = 100;
pub const FIND_ALL_BATCH: i64 = 100;

/// Sort direction for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Ascending(String),
    Descending(String),
}

impl Order {
    pub fn ascending(key: &str) -> Self {
        Order::Ascending(key.to_string())
    }

    pub fn descending(key: &str) -> Self {
        Order::Descending(key.to_string())
    }

    fn to_wire(&self) -> String {
        match self {
            Order::Ascending(key) => key.clone(),
            Order::Descending(key) => format!("-{}", key),
        }
    }
}

/// Declarative query over one record type.
#[derive(Clone)]
pub struct Query<R: Record> {
    constraints: Vec<Constraint>,
    limit: i64,
    skip: i64,
    keys: BTreeSet<String>,
    exclude_keys: BTreeSet<String>,
    include: BTreeSet<String>,
    fields: BTreeSet<String>,
    watch: BTreeSet<String>,
    order: Vec<Order>,
    read_preference: Option<String>,
    include_read_preference: Option<String>,
    subquery_read_preference: Option<String>,
    hint: Option<Value>,
    options: RequestOptions,
    /// Set only by `find_all` page queries: AND `objectId > cursor` onto the
    /// original constraints.
    cursor_after: Option<String>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> Default for Query<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Query<R> {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
            limit: DEFAULT_LIMIT,
            skip: 0,
            keys: BTreeSet::new(),
            exclude_keys: BTreeSet::new(),
            include: BTreeSet::new(),
            fields: BTreeSet::new(),
            watch: BTreeSet::new(),
            order: Vec::new(),
            read_preference: None,
            include_read_preference: None,
            subquery_read_preference: None,
            hint: None,
            options: RequestOptions::new(),
            cursor_after: None,
            _marker: PhantomData,
        }
    }

    // ---- builders ---------------------------------------------------------

    pub fn filter(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn filter_all(mut self, constraints: Vec<Constraint>) -> Self {
        self.constraints.extend(constraints);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.skip = skip;
        self
    }

    pub fn order(mut self, order: Vec<Order>) -> Self {
        self.order = order;
        self
    }

    /// Restrict returned fields to these keys (unions across calls).
    pub fn select(mut self, keys: &[&str]) -> Self {
        self.keys.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Omit these keys from returned records (unions across calls).
    pub fn exclude_keys(mut self, keys: &[&str]) -> Self {
        self.exclude_keys.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Resolve these pointer fields into full records (unions across calls).
    pub fn include(mut self, keys: &[&str]) -> Self {
        self.include.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Live-subscription field list; carried but not compiled into commands.
    pub fn fields(mut self, keys: &[&str]) -> Self {
        self.fields.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    /// Live-subscription watch list; carried but not compiled into commands.
    pub fn watch(mut self, keys: &[&str]) -> Self {
        self.watch.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn read_preference(mut self, preference: &str) -> Self {
        self.read_preference = Some(preference.to_string());
        self
    }

    pub fn include_read_preference(mut self, preference: &str) -> Self {
        self.include_read_preference = Some(preference.to_string());
        self
    }

    pub fn subquery_read_preference(mut self, preference: &str) -> Self {
        self.subquery_read_preference = Some(preference.to_string());
        self
    }

    pub fn hint(mut self, hint: impl Into<Value>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Header options attached to every command this query compiles to.
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    // ---- compilation ------------------------------------------------------

    fn where_tree(&self) -> Map<String, Value> {
        let mut tree = fold_constraints(&self.constraints);
        if let Some(after) = &self.cursor_after {
            let cursor = json!({"$gt": after});
            if tree.contains_key("objectId") {
                // The original constraints already mention objectId; AND the
                // cursor alongside them instead of displacing.
                let original = std::mem::take(&mut tree);
                tree.insert(
                    "$and".to_string(),
                    json!([original, {"objectId": cursor}]),
                );
            } else {
                tree.insert("objectId".to_string(), cursor);
            }
        }
        tree
    }

    /// The canonical facet map. Both the GET parameter list and the POST body
    /// derive from this with no extra state.
    fn facets(&self, limit: i64, count: bool, explain: bool) -> Map<String, Value> {
        let mut facets = Map::new();
        facets.insert("where".to_string(), Value::Object(self.where_tree()));
        facets.insert("limit".to_string(), json!(limit));
        facets.insert("skip".to_string(), json!(self.skip));
        if !self.keys.is_empty() {
            facets.insert("keys".to_string(), json!(join(&self.keys)));
        }
        if !self.exclude_keys.is_empty() {
            facets.insert("excludeKeys".to_string(), json!(join(&self.exclude_keys)));
        }
        if !self.include.is_empty() {
            facets.insert("include".to_string(), json!(join(&self.include)));
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self.order.iter().map(Order::to_wire).collect();
            facets.insert("order".to_string(), json!(order.join(",")));
        }
        if count {
            facets.insert("count".to_string(), json!(1));
        }
        if explain {
            facets.insert("explain".to_string(), json!(true));
        }
        if let Some(hint) = &self.hint {
            facets.insert("hint".to_string(), hint.clone());
        }
        if let Some(pref) = &self.read_preference {
            facets.insert("readPreference".to_string(), json!(pref));
        }
        if let Some(pref) = &self.include_read_preference {
            facets.insert("includeReadPreference".to_string(), json!(pref));
        }
        if let Some(pref) = &self.subquery_read_preference {
            facets.insert("subqueryReadPreference".to_string(), json!(pref));
        }
        facets
    }

    fn get_params(facets: &Map<String, Value>) -> Result<Vec<(String, String)>> {
        let mut params = Vec::with_capacity(facets.len());
        for (key, value) in facets {
            let flat = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => serde_json::to_string(other).map_err(Error::decode)?,
            };
            params.push((key.clone(), flat));
        }
        Ok(params)
    }

    /// Express the facets as a command: GET with flattened parameters, or,
    /// when the client is configured for it, POST with the facets as the
    /// body plus a `_method` marker so the server does not mistake it for a
    /// create.
    fn build_command<U>(
        &self,
        client: &Client,
        path: String,
        facets: Map<String, Value>,
        mapper: impl Fn(&[u8]) -> Result<U> + Send + Sync + 'static,
    ) -> Result<Command<U>> {
        let command = if client.config().use_post_for_query {
            let mut body = facets;
            body.insert("_method".to_string(), json!("GET"));
            Command::new(Method::Post, path, mapper).body(Value::Object(body))
        } else {
            let params = Self::get_params(&facets)?;
            Command::new(Method::Get, path, mapper).params(params)
        };
        Ok(command.options(self.options.clone()))
    }

    fn aggregate_path() -> String {
        format!("/aggregate/{}", R::CLASS_NAME)
    }

    // ---- execution --------------------------------------------------------

    /// Fetch matching records. A non-positive limit resolves to an empty
    /// result without touching the network.
    pub async fn find(&self, client: &Client) -> Result<Vec<R>> {
        if self.limit <= 0 {
            return Ok(Vec::new());
        }
        let facets = self.facets(self.limit, false, false);
        let command = self.build_command(client, R::class_path(), facets, |bytes| {
            Ok(codec::decode_body::<QueryResponse<R>>(bytes)?.results)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    async fn find_raw(&self, client: &Client) -> Result<Vec<Value>> {
        let facets = self.facets(self.limit, false, false);
        let command = self.build_command(client, R::class_path(), facets, |bytes| {
            Ok(codec::decode_body::<QueryResponse<Value>>(bytes)?.results)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    /// Fetch the first matching record. A non-positive limit fails with
    /// `ObjectNotFound` immediately; deliberately different from [`find`],
    /// which resolves empty.
    ///
    /// [`find`]: Query::find
    pub async fn first(&self, client: &Client) -> Result<R> {
        if self.limit <= 0 {
            return Err(Error::ObjectNotFound);
        }
        let facets = self.facets(1, false, false);
        let command = self.build_command(client, R::class_path(), facets, |bytes| {
            Ok(codec::decode_body::<QueryResponse<R>>(bytes)?.results)
        })?;
        let results = command.execute(client, &RequestOptions::new()).await?;
        results.into_iter().next().ok_or(Error::ObjectNotFound)
    }

    /// Count matching records. A non-positive limit resolves to zero without
    /// touching the network.
    pub async fn count(&self, client: &Client) -> Result<usize> {
        if self.limit <= 0 {
            return Ok(0);
        }
        let facets = self.facets(0, true, false);
        let command = self.build_command(client, R::class_path(), facets, |bytes| {
            Ok(codec::decode_body::<QueryResponse<Value>>(bytes)?
                .count
                .unwrap_or(0))
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    /// Fetch matching records and the total satisfying count in one round
    /// trip.
    pub async fn with_count(&self, client: &Client) -> Result<(Vec<R>, usize)> {
        if self.limit <= 0 {
            return Ok((Vec::new(), 0));
        }
        let facets = self.facets(self.limit, true, false);
        let command = self.build_command(client, R::class_path(), facets, |bytes| {
            let response = codec::decode_body::<QueryResponse<R>>(bytes)?;
            let count = response.count.unwrap_or(0);
            Ok((response.results, count))
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    /// Enumerate every matching record by paging on ascending `objectId`,
    /// bypassing server-side limit/skip.
    ///
    /// Requires the query to still have its default order, skip and limit;
    /// anything else signals intent this method would silently override, so
    /// it fails instead. Pages run strictly in sequence (each page's last id
    /// feeds the next page's cursor), and results come back in ascending
    /// objectId order regardless of the collection's natural order.
    pub async fn find_all(&self, client: &Client) -> Result<Vec<R>> {
        self.find_all_batch(client, None).await
    }

    pub async fn find_all_batch(&self, client: &Client, batch: Option<i64>) -> Result<Vec<R>> {
        if !self.order.is_empty() || self.skip > 0 || self.limit != DEFAULT_LIMIT {
            return Err(Error::OtherCause(
                "find_all requires default order, skip and limit".to_string(),
            ));
        }
        let batch_size = batch.unwrap_or(FIND_ALL_BATCH);
        if batch_size <= 0 {
            return Err(Error::OtherCause(
                "find_all batch size must be positive".to_string(),
            ));
        }
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut page = self.clone();
            page.order = vec![Order::ascending("objectId")];
            page.limit = batch_size;
            page.cursor_after = cursor.clone();

            let rows = page.find_raw(client).await?;
            let page_len = rows.len() as i64;
            let last_id = rows
                .last()
                .and_then(|row| row.get("objectId"))
                .and_then(Value::as_str)
                .map(String::from);
            for row in rows {
                all.push(codec::from_wire::<R>(row)?);
            }
            debug!(page_len, total = all.len(), "find_all page");
            if page_len < batch_size {
                break;
            }
            cursor = Some(last_id.ok_or_else(|| {
                Error::OtherCause("page row has no objectId; cannot advance cursor".to_string())
            })?);
        }
        Ok(all)
    }

    /// The `match` stage carries the constraint tree as a JSON string, not a
    /// nested object; the server parses it back out. An empty tree adds no
    /// stage at all.
    fn pipeline_stages(&self, caller_stages: Vec<Value>) -> Result<Vec<Value>> {
        let tree = fold_constraints(&self.constraints);
        let mut stages = Vec::new();
        if !tree.is_empty() {
            let tree = serde_json::to_string(&tree).map_err(Error::decode)?;
            stages.push(json!({"match": tree}));
        }
        stages.extend(caller_stages);
        Ok(stages)
    }

    fn elevated_options(&self) -> RequestOptions {
        let mut options = RequestOptions::new().with(RequestOption::UsePrimaryKey);
        options.union(&self.options);
        options
    }

    /// Run an aggregation pipeline. A non-empty `where` tree is prepended as
    /// a `match` stage ahead of the caller's stages; an empty one is omitted
    /// entirely. Requires the primary key (injected automatically).
    pub async fn aggregate<V: DeserializeOwned>(
        &self,
        client: &Client,
        pipeline: Vec<Value>,
    ) -> Result<Vec<V>> {
        let command = self.aggregate_command(client, pipeline, false, |bytes| {
            Ok(codec::decode_body::<QueryResponse<V>>(bytes)?.results)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    fn aggregate_command<U>(
        &self,
        client: &Client,
        pipeline: Vec<Value>,
        explain: bool,
        mapper: impl Fn(&[u8]) -> Result<U> + Send + Sync + 'static,
    ) -> Result<Command<U>> {
        let mut facets = Map::new();
        facets.insert(
            "pipeline".to_string(),
            Value::Array(self.pipeline_stages(pipeline)?),
        );
        if explain {
            facets.insert("explain".to_string(), json!(true));
        }
        if let Some(hint) = &self.hint {
            facets.insert("hint".to_string(), hint.clone());
        }
        let command = if client.config().use_post_for_query {
            let mut body = facets;
            body.insert("_method".to_string(), json!("GET"));
            Command::new(Method::Post, Self::aggregate_path(), mapper).body(Value::Object(body))
        } else {
            Command::new(Method::Get, Self::aggregate_path(), mapper)
                .params(Self::get_params(&facets)?)
        };
        Ok(command.options(self.elevated_options()))
    }

    /// Distinct values of one field across matching records. Requires the
    /// primary key (injected automatically).
    pub async fn distinct<V: DeserializeOwned>(
        &self,
        client: &Client,
        field: &str,
    ) -> Result<Vec<V>> {
        let command = self.distinct_command(client, field, false, |bytes| {
            Ok(codec::decode_body::<QueryResponse<V>>(bytes)?.results)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    fn distinct_command<U>(
        &self,
        client: &Client,
        field: &str,
        explain: bool,
        mapper: impl Fn(&[u8]) -> Result<U> + Send + Sync + 'static,
    ) -> Result<Command<U>> {
        let mut facets = Map::new();
        facets.insert("distinct".to_string(), json!(field));
        let tree = fold_constraints(&self.constraints);
        if !tree.is_empty() {
            facets.insert("where".to_string(), Value::Object(tree));
        }
        if explain {
            facets.insert("explain".to_string(), json!(true));
        }
        let command = if client.config().use_post_for_query {
            let mut body = facets;
            body.insert("_method".to_string(), json!("GET"));
            Command::new(Method::Post, Self::aggregate_path(), mapper).body(Value::Object(body))
        } else {
            Command::new(Method::Get, Self::aggregate_path(), mapper)
                .params(Self::get_params(&facets)?)
        };
        Ok(command.options(self.elevated_options()))
    }

    // ---- explain variants -------------------------------------------------
    //
    // Same compiled command plus the explain flag. MongoDB-backed servers do
    // not wrap explain output in the standard `{results: […]}` envelope, so
    // the caller must say which decode path applies; the wrong choice is a
    // decode error, never silently wrong data.

    pub async fn find_explain<V: DeserializeOwned>(
        &self,
        client: &Client,
        uses_mongodb: bool,
    ) -> Result<Vec<V>> {
        if self.limit <= 0 {
            return Ok(Vec::new());
        }
        let facets = self.facets(self.limit, false, true);
        let command = self.build_command(client, R::class_path(), facets, move |bytes| {
            decode_explain(bytes, uses_mongodb)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    pub async fn first_explain<V: DeserializeOwned>(
        &self,
        client: &Client,
        uses_mongodb: bool,
    ) -> Result<V> {
        if self.limit <= 0 {
            return Err(Error::ObjectNotFound);
        }
        let facets = self.facets(1, false, true);
        let command = self.build_command(client, R::class_path(), facets, move |bytes| {
            decode_explain(bytes, uses_mongodb)
        })?;
        let results: Vec<V> = command.execute(client, &RequestOptions::new()).await?;
        results.into_iter().next().ok_or(Error::ObjectNotFound)
    }

    pub async fn count_explain<V: DeserializeOwned>(
        &self,
        client: &Client,
        uses_mongodb: bool,
    ) -> Result<Vec<V>> {
        if self.limit <= 0 {
            return Ok(Vec::new());
        }
        let facets = self.facets(0, true, true);
        let command = self.build_command(client, R::class_path(), facets, move |bytes| {
            decode_explain(bytes, uses_mongodb)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    pub async fn aggregate_explain<V: DeserializeOwned>(
        &self,
        client: &Client,
        pipeline: Vec<Value>,
        uses_mongodb: bool,
    ) -> Result<Vec<V>> {
        let command = self.aggregate_command(client, pipeline, true, move |bytes| {
            decode_explain(bytes, uses_mongodb)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }

    pub async fn distinct_explain<V: DeserializeOwned>(
        &self,
        client: &Client,
        field: &str,
        uses_mongodb: bool,
    ) -> Result<Vec<V>> {
        let command = self.distinct_command(client, field, true, move |bytes| {
            decode_explain(bytes, uses_mongodb)
        })?;
        command.execute(client, &RequestOptions::new()).await
    }
}

fn decode_explain<V: DeserializeOwned>(bytes: &[u8], uses_mongodb: bool) -> Result<Vec<V>> {
    if uses_mongodb {
        Ok(vec![codec::decode_body::<V>(bytes)?])
    } else {
        Ok(codec::decode_body::<QueryResponse<V>>(bytes)?.results)
    }
}

fn join(keys: &BTreeSet<String>) -> String {
    keys.iter().cloned().collect::<Vec<_>>().join(",")
}
