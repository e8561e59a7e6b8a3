use std::sync::{Arc, Mutex};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;

use crate::config::EmailSettings;
use crate::emailer::DispatchClient;
use larder_core::export::render_html;
use larder_core::models::{
    Ingredient, IngredientUsage, Meal, NewIngredient, NewMeal, NewPantryItem, PantryItem,
    ShoppingList, UserContext,
};
use larder_core::service::PlannerService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    svc: Arc<Mutex<PlannerService>>,
    user: Arc<UserContext>,
    mailer: Option<Arc<DispatchClient>>,
    api_key: Option<String>,
}

// --- Request / Response types ---

fn default_category() -> String {
    larder_core::models::DEFAULT_CATEGORY.to_string()
}

fn default_quantity() -> i64 {
    1
}

#[derive(Deserialize)]
struct CreateIngredientRequest {
    name: String,
    #[serde(default = "default_category")]
    category: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct UpdateIngredientRequest {
    name: Option<String>,
    category: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct CreateMealRequest {
    title: String,
    #[serde(default)]
    ingredients: Vec<IngredientUsage>,
}

#[derive(Deserialize)]
struct UpdateMealRequest {
    title: Option<String>,
    ingredients: Option<Vec<IngredientUsage>>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct SelectionBody {
    meal_ids: Vec<i64>,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    notes: bool,
}

#[derive(Deserialize)]
struct QuickAddRequest {
    name: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct EmailRequest {
    to: Option<String>,
    #[serde(default)]
    notes: bool,
}

#[derive(Deserialize)]
struct CreatePantryRequest {
    name: String,
    #[serde(default = "default_category")]
    category: String,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct PickRequest {
    #[serde(default = "default_quantity")]
    quantity: i64,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Upstream(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(err) => {
                eprintln!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Ingredient handlers ---

async fn list_ingredients(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let ingredients = svc
        .list_ingredients(&state.user, params.q.as_deref())
        .context("database error")?;
    Ok(Json(ingredients))
}

async fn create_ingredient(
    State(state): State<AppState>,
    Json(req): Json<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let ingredient = svc
        .add_ingredient(
            &state.user,
            &NewIngredient {
                name: req.name,
                category: req.category,
                notes: req.notes,
            },
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

async fn update_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateIngredientRequest>,
) -> Result<Json<Ingredient>, ApiError> {
    if req.name.is_none() && req.category.is_none() && req.notes.is_none() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }

    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let existing = svc
        .get_ingredient(&state.user, id)
        .map_err(|_| ApiError::NotFound(format!("Ingredient {id} not found")))?;

    let ingredient = svc
        .update_ingredient(
            &state.user,
            id,
            &NewIngredient {
                name: req.name.unwrap_or(existing.name),
                category: req.category.unwrap_or(existing.category),
                notes: req.notes.or(existing.notes),
            },
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok(Json(ingredient))
}

async fn delete_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if svc
        .delete_ingredient(&state.user, id)
        .context("database error")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Ingredient {id} not found")))
    }
}

// --- Meal handlers ---

async fn list_meals(State(state): State<AppState>) -> Result<Json<Vec<Meal>>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let meals = svc.list_meals(&state.user).context("database error")?;
    Ok(Json(meals))
}

async fn create_meal(
    State(state): State<AppState>,
    Json(req): Json<CreateMealRequest>,
) -> Result<(StatusCode, Json<Meal>), ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let meal = svc
        .create_meal(
            &state.user,
            &NewMeal {
                title: req.title,
                ingredients: req.ingredients,
            },
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok((StatusCode::CREATED, Json(meal)))
}

async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Meal>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let meal = svc
        .get_meal(&state.user, id)
        .map_err(|_| ApiError::NotFound(format!("Meal {id} not found")))?;
    Ok(Json(meal))
}

async fn update_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateMealRequest>,
) -> Result<Json<Meal>, ApiError> {
    if req.title.is_none() && req.ingredients.is_none() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }

    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let existing = svc
        .get_meal(&state.user, id)
        .map_err(|_| ApiError::NotFound(format!("Meal {id} not found")))?;

    let meal = svc
        .update_meal(
            &state.user,
            id,
            &NewMeal {
                title: req.title.unwrap_or(existing.title),
                ingredients: req.ingredients.unwrap_or(existing.ingredients),
            },
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok(Json(meal))
}

async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if svc.delete_meal(&state.user, id).context("database error")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Meal {id} not found")))
    }
}

// --- Selection handlers ---

async fn get_selection(State(state): State<AppState>) -> Result<Json<SelectionBody>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let meal_ids = svc
        .selected_meal_ids(&state.user)
        .context("database error")?;
    Ok(Json(SelectionBody { meal_ids }))
}

async fn set_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionBody>,
) -> Result<Json<SelectionBody>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    svc.select_meals(&state.user, &req.meal_ids)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    let meal_ids = svc
        .selected_meal_ids(&state.user)
        .context("database error")?;
    Ok(Json(SelectionBody { meal_ids }))
}

// --- Shopping list handlers ---

async fn get_list(State(state): State<AppState>) -> Result<Json<ShoppingList>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let list = svc.shopping_list(&state.user).context("database error")?;
    Ok(Json(list))
}

async fn get_list_html(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Html<String>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let list = svc.shopping_list(&state.user).context("database error")?;
    Ok(Html(render_html(&list.items, params.notes)))
}

async fn quick_add_item(
    State(state): State<AppState>,
    Json(req): Json<QuickAddRequest>,
) -> Result<(StatusCode, Json<Meal>), ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let meal = svc
        .quick_add(
            &state.user,
            &req.name,
            &req.category,
            req.quantity,
            req.notes.as_deref(),
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok((StatusCode::CREATED, Json(meal)))
}

async fn email_list(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(mailer) = state.mailer.clone() else {
        return Err(ApiError::BadRequest(
            "Email dispatch is not configured on this server".to_string(),
        ));
    };

    let to = req
        .to
        .or_else(|| state.user.email.clone())
        .ok_or_else(|| ApiError::BadRequest("No recipient address".to_string()))?;

    // Build the body with the lock held, send without it
    let (html, count) = {
        let svc = state
            .svc
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let list = svc.shopping_list(&state.user).context("database error")?;
        if list.items.is_empty() {
            return Err(ApiError::BadRequest(
                "Shopping list is empty — nothing to send".to_string(),
            ));
        }
        (render_html(&list.items, req.notes), list.items.len())
    };

    mailer
        .send_async(&to, &state.user.display_name, &html)
        .await
        .map_err(|e| ApiError::Upstream(format!("{e}")))?;

    Ok(Json(serde_json::json!({ "sent": count, "to": to })))
}

// --- Pantry handlers ---

async fn list_pantry(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<PantryItem>>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let items = svc
        .list_pantry_items(&state.user, params.q.as_deref())
        .context("database error")?;
    Ok(Json(items))
}

async fn create_pantry_item(
    State(state): State<AppState>,
    Json(req): Json<CreatePantryRequest>,
) -> Result<(StatusCode, Json<PantryItem>), ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let item = svc
        .add_pantry_item(
            &state.user,
            &NewPantryItem {
                name: req.name,
                category: req.category,
                notes: req.notes,
            },
        )
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn delete_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let items = svc
        .list_pantry_items(&state.user, None)
        .context("database error")?;
    let Some(item) = items.into_iter().find(|i| i.id == id) else {
        return Err(ApiError::NotFound(format!("Pantry item {id} not found")));
    };
    svc.remove_pantry_item(&state.user, &item.name)
        .context("database error")?;
    Ok(StatusCode::NO_CONTENT)
}

async fn pick_pantry_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<PickRequest>,
) -> Result<Json<Meal>, ApiError> {
    let svc = state
        .svc
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    let items = svc
        .list_pantry_items(&state.user, None)
        .context("database error")?;
    let Some(item) = items.into_iter().find(|i| i.id == id) else {
        return Err(ApiError::NotFound(format!("Pantry item {id} not found")));
    };
    let meal = svc
        .pick_pantry_item(&state.user, &item.name, req.quantity)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    Ok(Json(meal))
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/ingredients",
            get(list_ingredients).post(create_ingredient),
        )
        .route(
            "/api/ingredients/{id}",
            put(update_ingredient).delete(delete_ingredient),
        )
        .route("/api/meals", get(list_meals).post(create_meal))
        .route(
            "/api/meals/{id}",
            get(get_meal).put(update_meal).delete(delete_meal),
        )
        .route("/api/selection", get(get_selection).put(set_selection))
        .route("/api/list", get(get_list))
        .route("/api/list/html", get(get_list_html))
        .route("/api/list/items", post(quick_add_item))
        .route("/api/list/email", post(email_list))
        .route("/api/pantry", get(list_pantry).post(create_pantry_item))
        .route("/api/pantry/{id}", axum::routing::delete(delete_pantry_item))
        .route("/api/pantry/{id}/pick", post(pick_pantry_item))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    svc: PlannerService,
    user: UserContext,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    email_settings: Option<EmailSettings>,
) -> anyhow::Result<()> {
    let mailer = email_settings.map(|s| Arc::new(DispatchClient::new(&s)));
    if mailer.is_none() {
        eprintln!(
            "Note: LARDER_EMAIL_URL is not set; the /api/list/email endpoint will refuse requests."
        );
    }

    let state = AppState {
        svc: Arc::new(Mutex::new(svc)),
        user: Arc::new(user),
        mailer,
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state(api_key: Option<String>) -> AppState {
        AppState {
            svc: Arc::new(Mutex::new(PlannerService::new_in_memory().unwrap())),
            user: Arc::new(UserContext {
                user_id: "user-test".to_string(),
                display_name: "Alex".to_string(),
                email: Some("alex@example.com".to_string()),
            }),
            mailer: None,
            api_key,
        }
    }

    fn test_app(api_key: Option<String>) -> Router {
        build_router(test_state(api_key))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn auth_missing_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/meals")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid or missing API key");
    }

    #[tokio::test]
    async fn auth_wrong_key_returns_401() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/meals")
                    .header("Authorization", "Bearer wrong-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_correct_key_succeeds() {
        let app = test_app(Some("test-key-abc123".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/meals")
                    .header("Authorization", "Bearer test-key-abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_auth_mode_allows_requests() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/meals")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app(None);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/meals")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn security_headers_on_auth_failure() {
        let app = test_app(Some("secret".to_string()));

        let response = app
            .oneshot(
                axum::http::Request::get("/api/meals")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app(None);

        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/api/meals")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("secret database path /home/user/.larder"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(!json["error"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn ingredient_crud_roundtrip() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/ingredients",
                serde_json::json!({"name": "Milk", "category": "Dairy", "notes": "2% fat"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        let id = created["id"].as_i64().unwrap();
        assert_eq!(created["name"], "Milk");
        assert_eq!(created["category"], "Dairy");

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::get("/api/ingredients?q=milk")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = body_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/ingredients/{id}"),
                serde_json::json!({"name": "Whole Milk"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let updated = body_json(response).await;
        assert_eq!(updated["name"], "Whole Milk");

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::delete(format!("/api/ingredients/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/ingredients/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_category_rejected() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/ingredients",
                serde_json::json!({"name": "Widget", "category": "Hardware"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn selection_and_aggregated_list() {
        let app = test_app(None);

        // Two meals sharing Milk: 1 + 2 must aggregate to 3
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/meals",
                serde_json::json!({
                    "title": "Cereal",
                    "ingredients": [
                        {"ingredient_id": 1, "name": "Milk", "category": "Dairy", "quantity": 1}
                    ]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cereal = body_json(response).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/meals",
                serde_json::json!({
                    "title": "Pancakes",
                    "ingredients": [
                        {"ingredient_id": 1, "name": "Milk", "category": "Dairy", "quantity": 2},
                        {"ingredient_id": 2, "name": "Flour", "category": "Pantry"}
                    ]
                }),
            ))
            .await
            .unwrap();
        let pancakes = body_json(response).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                "/api/selection",
                serde_json::json!({"meal_ids": [cereal["id"], pancakes["id"]]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::get("/api/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let list = body_json(response).await;
        let items = list["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        // Sorted by category: Dairy before Pantry
        assert_eq!(items[0]["name"], "Milk");
        assert_eq!(items[0]["quantity"], 3);
        assert_eq!(items[1]["name"], "Flour");
        assert_eq!(items[1]["quantity"], 1);

        // HTML export mirrors the same grouping
        let response = app
            .oneshot(
                axum::http::Request::get("/api/list/html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(
            html,
            "<h3>Dairy</h3><li>(3) Milk</li><h3>Pantry</h3><li>Flour</li>"
        );
    }

    #[tokio::test]
    async fn selection_rejects_unknown_meal() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/selection",
                serde_json::json!({"meal_ids": [42]}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn deleting_meal_prunes_selection() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/meals",
                serde_json::json!({"title": "Tacos"}),
            ))
            .await
            .unwrap();
        let meal = body_json(response).await;
        let id = meal["id"].as_i64().unwrap();

        app.clone()
            .oneshot(json_request(
                "PUT",
                "/api/selection",
                serde_json::json!({"meal_ids": [id]}),
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::delete(format!("/api/meals/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/selection")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let selection = body_json(response).await;
        assert!(selection["meal_ids"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn quick_add_creates_standalone_meal() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/list/items",
                serde_json::json!({"name": "Paper Towels"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let meal = body_json(response).await;
        assert_eq!(meal["title"], "Standalone Items");

        let response = app
            .oneshot(
                axum::http::Request::get("/api/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let list = body_json(response).await;
        assert_eq!(list["items"].as_array().unwrap().len(), 1);
        assert_eq!(list["items"][0]["name"], "Paper Towels");
    }

    #[tokio::test]
    async fn email_without_mailer_is_rejected() {
        let app = test_app(None);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/list/email",
                serde_json::json!({"to": "alex@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .contains("not configured")
        );
    }

    #[tokio::test]
    async fn pantry_endpoints_roundtrip() {
        let app = test_app(None);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/pantry",
                serde_json::json!({"name": "Olive Oil", "category": "Pantry"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let item = body_json(response).await;
        let id = item["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/api/pantry/{id}/pick"),
                serde_json::json!({"quantity": 2}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::get("/api/list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let list = body_json(response).await;
        assert_eq!(list["items"][0]["name"], "Olive Oil");
        assert_eq!(list["items"][0]["quantity"], 2);

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::delete(format!("/api/pantry/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(
                axum::http::Request::delete(format!("/api/pantry/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
