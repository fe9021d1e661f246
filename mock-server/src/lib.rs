//! In-memory stand-in for the Service Layer, used by the client's
//! integration tests.
//!
//! Serves `Login`, `$metadata` and an `Orders` entity set with keyed reads,
//! `$count`, create/update/delete and bound `Close`/`Cancel` actions. Every
//! route except `Login` requires a `B1SESSION` cookie issued by `Login`.
//! `$filter` understands `<field> <op> <literal>` clauses joined by `and`
//! and `or` (without parentheses), which is enough to exercise the client.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

pub const ODATA_JSON: &str = "application/json;odata=minimalmetadata;charset=utf-8";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
/// The only password `Login` accepts.
pub const PASSWORD: &str = "secret";

const METADATA: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="SAPB1" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityType Name="Document"><Key><PropertyRef Name="DocEntry"/></Key></EntityType>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    pub doc_entry: i64,
    pub card_code: String,
    pub doc_total: f64,
    pub document_status: String,
    pub comments: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateOrder {
    pub card_code: String,
    #[serde(default)]
    pub doc_total: f64,
    pub comments: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateOrder {
    pub card_code: Option<String>,
    pub doc_total: Option<f64>,
    pub comments: Option<String>,
}

#[derive(Deserialize)]
pub struct Login {
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "CompanyDB")]
    pub company_db: String,
}

#[derive(Default)]
pub struct Store {
    orders: BTreeMap<i64, Order>,
    last_entry: i64,
    sessions: HashSet<String>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/b1s/v2/Login", post(login))
        .route(
            "/b1s/v2/{resource}",
            get(read)
                .post(create)
                .patch(update)
                .put(update)
                .delete(remove),
        )
        .route("/b1s/v2/{resource}/{action}", get(read_nested).post(run_action))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn login(State(db): State<Db>, Json(input): Json<Login>) -> Response {
    if input.password != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, -304, "Fail to get DB Credentials");
    }
    let session = Uuid::new_v4().to_string();
    db.write().await.sessions.insert(session.clone());
    info!(user = %input.user_name, company = %input.company_db, "session opened");

    (
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, format!("B1SESSION={session}; path=/b1s/v2; HttpOnly")),
            (header::SET_COOKIE, "ROUTEID=.node1; path=/b1s".to_string()),
        ]),
        [(header::CONTENT_TYPE, ODATA_JSON)],
        json!({"SessionId": session, "Version": "1000190", "SessionTimeout": 30}).to_string(),
    )
        .into_response()
}

async fn read(
    State(db): State<Db>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize(&db, &headers).await {
        return denied;
    }
    if resource == "$metadata" {
        return ([(header::CONTENT_TYPE, "application/xml")], METADATA).into_response();
    }

    let store = db.read().await;
    match split_key(&resource) {
        ("Orders", None) => list_orders(&store, &params),
        ("Orders", Some(key)) => match key.parse().ok().and_then(|k: i64| store.orders.get(&k)) {
            Some(order) => json_response(StatusCode::OK, to_value(order)),
            None => not_found(),
        },
        _ => unknown_resource(&resource),
    }
}

async fn read_nested(
    State(db): State<Db>,
    Path((resource, action)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize(&db, &headers).await {
        return denied;
    }
    if resource != "Orders" || action != "$count" {
        return unknown_resource(&format!("{resource}/{action}"));
    }
    let store = db.read().await;
    match matching(&store, &params) {
        Ok(orders) => ([(header::CONTENT_TYPE, TEXT_PLAIN)], orders.len().to_string()).into_response(),
        Err(bad) => bad,
    }
}

async fn create(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(input): Json<CreateOrder>,
) -> Response {
    if let Err(denied) = authorize(&db, &headers).await {
        return denied;
    }
    if resource != "Orders" {
        return unknown_resource(&resource);
    }
    let mut store = db.write().await;
    store.last_entry += 1;
    let order = Order {
        doc_entry: store.last_entry,
        card_code: input.card_code,
        doc_total: input.doc_total,
        document_status: "bost_Open".to_string(),
        comments: input.comments,
    };
    store.orders.insert(order.doc_entry, order.clone());
    json_response(StatusCode::CREATED, to_value(&order))
}

async fn update(
    State(db): State<Db>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateOrder>,
) -> Response {
    if let Err(denied) = authorize(&db, &headers).await {
        return denied;
    }
    let mut store = db.write().await;
    let Some(order) = order_mut(&mut store, &resource) else {
        return not_found();
    };
    if let Some(card_code) = input.card_code {
        order.card_code = card_code;
    }
    if let Some(doc_total) = input.doc_total {
        order.doc_total = doc_total;
    }
    if input.comments.is_some() {
        order.comments = input.comments;
    }

    let wants_content = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"));
    if wants_content {
        json_response(StatusCode::OK, to_value(order))
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn remove(State(db): State<Db>, Path(resource): Path<String>, headers: HeaderMap) -> Response {
    if let Err(denied) = authorize(&db, &headers).await {
        return denied;
    }
    let mut store = db.write().await;
    let removed = match split_key(&resource) {
        ("Orders", Some(key)) => key.parse().ok().and_then(|k: i64| store.orders.remove(&k)),
        _ => None,
    };
    match removed {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

async fn run_action(
    State(db): State<Db>,
    Path((resource, action)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorize(&db, &headers).await {
        return denied;
    }
    let status = match action.as_str() {
        "Close" => "bost_Close",
        "Cancel" => "bost_Cancelled",
        _ => return unknown_resource(&format!("{resource}/{action}")),
    };
    let mut store = db.write().await;
    match order_mut(&mut store, &resource) {
        Some(order) => {
            order.document_status = status.to_string();
            StatusCode::NO_CONTENT.into_response()
        }
        None => not_found(),
    }
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), Response> {
    let known = match session_of(headers) {
        Some(session) => db.read().await.sessions.contains(&session),
        None => false,
    };
    if known {
        Ok(())
    } else {
        Err(error(
            StatusCode::UNAUTHORIZED,
            301,
            "Invalid session or session already timeout.",
        ))
    }
}

fn session_of(headers: &HeaderMap) -> Option<String> {
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "B1SESSION")
        .map(|(_, value)| value.to_string())
}

/// `Orders(5)` -> `("Orders", Some("5"))`.
fn split_key(resource: &str) -> (&str, Option<&str>) {
    match resource.strip_suffix(')').and_then(|r| r.split_once('(')) {
        Some((name, key)) => (name, Some(key)),
        None => (resource, None),
    }
}

fn order_mut<'a>(store: &'a mut Store, resource: &str) -> Option<&'a mut Order> {
    match split_key(resource) {
        ("Orders", Some(key)) => {
            let key: i64 = key.parse().ok()?;
            store.orders.get_mut(&key)
        }
        _ => None,
    }
}

fn list_orders(store: &Store, params: &HashMap<String, String>) -> Response {
    let orders = match matching(store, params) {
        Ok(orders) => orders,
        Err(bad) => return bad,
    };
    let total = orders.len();
    let skip = params.get("$skip").and_then(|s| s.parse().ok()).unwrap_or(0);
    let top = params.get("$top").and_then(|s| s.parse().ok()).unwrap_or(usize::MAX);
    let page: Vec<Value> = orders.into_iter().skip(skip).take(top).collect();

    let mut envelope = serde_json::Map::new();
    if params.get("$inlinecount").map(String::as_str) == Some("allpages") {
        envelope.insert("odata.count".to_string(), Value::String(total.to_string()));
    }
    envelope.insert("value".to_string(), Value::Array(page));
    json_response(StatusCode::OK, Value::Object(envelope))
}

fn matching(store: &Store, params: &HashMap<String, String>) -> Result<Vec<Value>, Response> {
    let predicate = params.get("$filter").map(|f| parse_filter(f)).transpose()?;
    Ok(store
        .orders
        .values()
        .map(to_value)
        .filter(|order| predicate.as_ref().map_or(true, |p| p.matches(order)))
        .collect())
}

/// Disjunction of conjunctions.
struct Predicate(Vec<Vec<Clause>>);

struct Clause {
    field: String,
    op: String,
    literal: Value,
}

impl Predicate {
    fn matches(&self, entity: &Value) -> bool {
        self.0
            .iter()
            .any(|group| group.iter().all(|clause| clause.holds(entity)))
    }
}

impl Clause {
    fn holds(&self, entity: &Value) -> bool {
        let ordering = match (entity.get(&self.field), &self.literal) {
            (Some(Value::String(a)), Value::String(b)) => Some(a.cmp(b)),
            (Some(Value::Number(a)), Value::Number(b)) => {
                a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
            }
            _ => None,
        };
        let Some(ordering) = ordering else {
            return false;
        };
        match self.op.as_str() {
            "eq" => ordering == Ordering::Equal,
            "ne" => ordering != Ordering::Equal,
            "gt" => ordering == Ordering::Greater,
            "ge" => ordering != Ordering::Less,
            "lt" => ordering == Ordering::Less,
            _ => ordering != Ordering::Greater,
        }
    }
}

fn parse_filter(expr: &str) -> Result<Predicate, Response> {
    let groups = expr
        .split(" or ")
        .map(|group| {
            group
                .split(" and ")
                .map(parse_clause)
                .collect::<Result<Vec<Clause>, Response>>()
        })
        .collect::<Result<Vec<Vec<Clause>>, Response>>()?;
    Ok(Predicate(groups))
}

fn parse_clause(clause: &str) -> Result<Clause, Response> {
    let invalid = || error(StatusCode::BAD_REQUEST, -1000, &format!("Invalid filter: {clause}"));
    let mut parts = clause.trim().splitn(3, ' ');
    let (Some(field), Some(op), Some(literal)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    if !matches!(op, "eq" | "ne" | "gt" | "ge" | "lt" | "le") {
        return Err(invalid());
    }
    let literal = match literal.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')) {
        Some(text) => Value::String(text.replace("''", "'")),
        None => literal
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid)?,
    };
    Ok(Clause {
        field: field.to_string(),
        op: op.to_string(),
        literal,
    })
}

fn to_value(order: &Order) -> Value {
    serde_json::to_value(order).unwrap_or(Value::Null)
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, ODATA_JSON)], body.to_string()).into_response()
}

fn error(status: StatusCode, code: i64, message: &str) -> Response {
    json_response(
        status,
        json!({"error": {"code": code, "message": {"lang": "en-us", "value": message}}}),
    )
}

fn not_found() -> Response {
    error(
        StatusCode::NOT_FOUND,
        -2028,
        "No matching records found (ODBC -2028)",
    )
}

fn unknown_resource(resource: &str) -> Response {
    error(
        StatusCode::NOT_FOUND,
        -1000,
        &format!("Invalid resource path: {resource}"),
    )
}
