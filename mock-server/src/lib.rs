use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const LOGIN: &str = "root";
pub const PASSWORD: &str = "PRODEX";

/// Endpoint path segments served by the mock.
pub const ENDPOINTS: &[&str] = &[
    "assets",
    "asset-types",
    "groups",
    "notes",
    "playlists",
    "projects",
    "sequences",
    "shots",
    "status",
    "steps",
    "tags",
    "tasks",
    "users",
    "versions",
];

/// Fields that always hold a list of identifiers.
const LIST_FIELDS: &[&str] = &["assets", "tags", "versions", "users", "groups", "shots"];

static NULL: Value = Value::Null;

type Failure = (StatusCode, Json<Value>);
type Record = Map<String, Value>;

#[derive(Default)]
pub struct Store {
    tokens: HashSet<String>,
    tables: HashMap<String, BTreeMap<u64, Record>>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/api/token-auth/", post(token_auth))
        .route("/api/{endpoint}/", get(list_records).post(create_record).options(describe))
        .route("/api/{endpoint}/fields/", get(list_fields))
        .route("/api/{endpoint}/{id}/", patch(update_record).delete(delete_record))
        .route("/api/{endpoint}/{id}/restore/", patch(restore_record))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn failure(status: StatusCode, detail: impl Into<String>) -> Failure {
    (status, Json(json!({ "detail": detail.into() })))
}

fn check_endpoint(endpoint: &str) -> Result<(), Failure> {
    if ENDPOINTS.contains(&endpoint) {
        Ok(())
    } else {
        Err(failure(StatusCode::NOT_FOUND, "Not found."))
    }
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), Failure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Token "));
    let known = match token {
        Some(token) => db.read().await.tokens.contains(token),
        None => false,
    };
    if known {
        Ok(())
    } else {
        Err(failure(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided."))
    }
}

async fn token_auth(State(db): State<Db>, Json(input): Json<Credentials>) -> Result<Json<Value>, Failure> {
    if input.username != LOGIN || input.password != PASSWORD {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "non_field_errors": ["Unable to log in with provided credentials."] })),
        ));
    }
    let token = Uuid::new_v4().simple().to_string();
    db.write().await.tokens.insert(token.clone());
    tracing::info!(user = %input.username, "issued token");
    Ok(Json(json!({ "token": token, "user": { "id": 1, "username": LOGIN } })))
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => text(a).cmp(&text(b)),
    }
}

fn numeric_cmp(value: &Value, param: &str) -> Option<Ordering> {
    let param: f64 = param.parse().ok()?;
    value.as_f64()?.partial_cmp(&param)
}

fn lookup_matches(record: &Record, key: &str, param: &str) -> Result<bool, Failure> {
    let (field, lookup) = match key.split_once("__") {
        Some((field, lookup)) => (field, Some(lookup)),
        None => (key, None),
    };
    let value = record.get(field).unwrap_or(&NULL);
    let matched = match lookup {
        None => text(value) == param,
        Some("in") => param.split(',').any(|item| item == text(value)),
        Some("gt") => numeric_cmp(value, param) == Some(Ordering::Greater),
        Some("gte") => matches!(numeric_cmp(value, param), Some(Ordering::Greater | Ordering::Equal)),
        Some("lt") => numeric_cmp(value, param) == Some(Ordering::Less),
        Some("lte") => matches!(numeric_cmp(value, param), Some(Ordering::Less | Ordering::Equal)),
        Some("contains") => text(value).contains(param),
        Some("icontains") => text(value).to_lowercase().contains(&param.to_lowercase()),
        Some("startswith") => text(value).starts_with(param),
        Some("isnull") => value.is_null() == param.eq_ignore_ascii_case("true"),
        Some(other) => {
            return Err(failure(StatusCode::BAD_REQUEST, format!("unsupported lookup: {other}")));
        }
    };
    Ok(matched)
}

fn project(mut record: Record, params: &HashMap<String, String>) -> Record {
    if let Some(fields) = params.get("fields") {
        let keep: HashSet<&str> = fields.split(',').collect();
        record.retain(|key, _| keep.contains(key.as_str()));
    }
    if let Some(omit) = params.get("omit") {
        for key in omit.split(',') {
            record.remove(key);
        }
    }
    record
}

async fn list_records(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;

    let store = db.read().await;
    let mut records = Vec::new();
    if let Some(table) = store.tables.get(&endpoint) {
        'records: for record in table.values() {
            if !record.get("trashed_at").unwrap_or(&NULL).is_null() {
                continue;
            }
            for (key, param) in &params {
                if matches!(key.as_str(), "fields" | "omit" | "ordering") {
                    continue;
                }
                if !lookup_matches(record, key, param)? {
                    continue 'records;
                }
            }
            records.push(record.clone());
        }
    }

    if let Some(ordering) = params.get("ordering") {
        let (field, descending) = match ordering.strip_prefix('-') {
            Some(field) => (field, true),
            None => (ordering.as_str(), false),
        };
        records.sort_by(|a, b| {
            let order = compare(a.get(field).unwrap_or(&NULL), b.get(field).unwrap_or(&NULL));
            if descending {
                order.reverse()
            } else {
                order
            }
        });
    }

    Ok(Json(records.into_iter().map(|record| Value::Object(project(record, &params))).collect()))
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Read a JSON object or `multipart/form-data` body into a record payload.
async fn read_payload(req: Request) -> Result<Record, Failure> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    if !is_multipart {
        let Json(value) = Json::<Value>::from_request(req, &())
            .await
            .map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?;
        return match value {
            Value::Object(map) => Ok(map),
            _ => Err(failure(StatusCode::BAD_REQUEST, "expected a JSON object")),
        };
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?;
    let mut payload = Record::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            field
                .bytes()
                .await
                .map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?;
            payload.insert(name, Value::String(format!("/media/thumbnails/{file_name}")));
            continue;
        }
        let raw = field
            .text()
            .await
            .map_err(|e| failure(StatusCode::BAD_REQUEST, e.body_text()))?;
        let value = raw.parse::<i64>().map(Value::from).unwrap_or(Value::String(raw));
        if LIST_FIELDS.contains(&name.as_str()) {
            match payload.entry(name.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(items) => items.push(value),
                _ => return Err(failure(StatusCode::BAD_REQUEST, format!("{name} mixes file and value parts"))),
            }
        } else {
            payload.insert(name, value);
        }
    }
    Ok(payload)
}

async fn create_record(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    req: Request,
) -> Result<(StatusCode, Json<Value>), Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;
    let mut record = read_payload(req).await?;

    let mut store = db.write().await;
    store.next_id += 1;
    let id = store.next_id;
    record.insert("id".to_string(), json!(id));
    record.insert("trashed_at".to_string(), Value::Null);
    for field in LIST_FIELDS {
        if let Some(value) = record.get_mut(*field) {
            if !value.is_array() {
                *value = Value::Array(vec![value.take()]);
            }
        }
    }
    store.tables.entry(endpoint).or_default().insert(id, record.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(record))))
}

async fn update_record(
    State(db): State<Db>,
    Path((endpoint, id)): Path<(String, u64)>,
    headers: HeaderMap,
    req: Request,
) -> Result<Json<Value>, Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;
    let payload = read_payload(req).await?;

    let mut store = db.write().await;
    let record = store
        .tables
        .get_mut(&endpoint)
        .and_then(|table| table.get_mut(&id))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Not found."))?;
    for (key, value) in payload {
        if key != "id" {
            record.insert(key, value);
        }
    }
    Ok(Json(Value::Object(record.clone())))
}

async fn delete_record(
    State(db): State<Db>,
    Path((endpoint, id)): Path<(String, u64)>,
    headers: HeaderMap,
) -> Result<Response, Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;

    let mut store = db.write().await;
    let table = store
        .tables
        .get_mut(&endpoint)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Not found."))?;
    let record = table
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Not found."))?;

    if record.get("trashed_at").is_some_and(|v| !v.is_null()) {
        table.remove(&id);
        tracing::info!(%endpoint, id, "hard deleted");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    record.insert("trashed_at".to_string(), json!(chrono::Utc::now().to_rfc3339()));
    Ok((StatusCode::OK, Json(Value::Object(record.clone()))).into_response())
}

async fn restore_record(
    State(db): State<Db>,
    Path((endpoint, id)): Path<(String, u64)>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;

    let mut store = db.write().await;
    let record = store
        .tables
        .get_mut(&endpoint)
        .and_then(|table| table.get_mut(&id))
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "Not found."))?;
    record.insert("trashed_at".to_string(), Value::Null);
    Ok(Json(Value::Object(record.clone())))
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn schema_fields(endpoint: &str) -> Vec<&'static str> {
    let mut fields = vec!["id", "name", "description", "thumbnail", "trashed_at"];
    let extra: &[&str] = match endpoint {
        "shots" => &["sequence", "assets", "tags", "frame_in", "frame_out"],
        "assets" => &["project", "asset_type", "tags"],
        "sequences" => &["project", "shots"],
        "playlists" => &["project", "versions"],
        "groups" => &["users"],
        _ => &["project"],
    };
    fields.extend_from_slice(extra);
    fields
}

async fn list_fields(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<&'static str>>, Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;
    Ok(Json(schema_fields(&endpoint)))
}

async fn describe(
    State(db): State<Db>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, Failure> {
    check_endpoint(&endpoint)?;
    authorize(&db, &headers).await?;
    let fields: Map<String, Value> = schema_fields(&endpoint)
        .into_iter()
        .map(|name| {
            let kind = match name {
                "id" => "integer",
                "trashed_at" => "datetime",
                "thumbnail" => "image upload",
                field if LIST_FIELDS.contains(&field) => "field",
                _ => "string",
            };
            let read_only = matches!(name, "id" | "trashed_at");
            (name.to_string(), json!({ "type": kind, "read_only": read_only }))
        })
        .collect();
    Ok(Json(json!({
        "name": endpoint,
        "renders": ["application/json"],
        "parses": ["application/json", "multipart/form-data"],
        "actions": { "POST": fields },
    })))
}
