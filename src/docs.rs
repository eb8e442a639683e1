use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Map, Value};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::models;
use crate::routes::{self, proxy::ProxyMethod, proxy::PROXY_ROUTES};

#[derive(OpenApi)]
#[openapi(
    paths(routes::health::health, routes::auth::token),
    components(
        schemas(
            models::ProxyEnvelope,
            routes::health::HealthResponse,
            routes::auth::TokenResponse
        )
    ),
    tags(
        (name = "Health", description = "Gateway health"),
        (name = "Auth", description = "Session bridge"),
        (name = "Proxy", description = "Same-origin relays to the backend API")
    )
)]
pub struct ApiDoc;

pub fn build_openapi(port: u16) -> anyhow::Result<utoipa::openapi::OpenApi> {
    let mut doc = serde_json::to_value(ApiDoc::openapi())?;

    add_proxy_paths(&mut doc);
    ensure_security_components(&mut doc);
    ensure_servers(&mut doc, port);

    Ok(serde_json::from_value(doc)?)
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> anyhow::Result<Router> {
    let swagger_config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .with_credentials(true)
        .persist_authorization(true);

    let doc_json = Arc::new(serde_json::to_value(&doc)?);

    let json_route = get(move || {
        let doc_json = Arc::clone(&doc_json);
        async move { Json((*doc_json).clone()) }
    });

    Ok(Router::new()
        .route("/api-docs/openapi.json", json_route)
        .merge(SwaggerUi::new("/docs").config(swagger_config)))
}

/// Proxy handlers are generated from the route table, so their operations
/// are described from the same table.
fn add_proxy_paths(doc: &mut Value) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    let Some(paths) = root
        .entry("paths")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
    else {
        return;
    };

    for route in PROXY_ROUTES {
        let method = match route.method {
            ProxyMethod::Get => "get",
            ProxyMethod::Post => "post",
        };

        let mut operation = json!({
            "tags": ["Proxy"],
            "summary": format!("Relay to {}", route.backend_path),
            "security": [{"bearerAuth": []}],
            "responses": {
                "default": {"description": "Backend response, status and body passed through"},
                "401": {
                    "description": "Authorization header required",
                    "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ProxyEnvelope"}}}
                },
                "500": {
                    "description": route.failure_message,
                    "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ProxyEnvelope"}}}
                }
            }
        });
        if route.method.carries_body() {
            operation["requestBody"] = json!({"content": {"application/json": {"schema": {"type": "object"}}}});
        }

        let item = paths
            .entry(route.local_path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(item) = item.as_object_mut() {
            item.insert(method.to_string(), operation);
        }
    }
}

fn ensure_security_components(doc: &mut Value) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };
    let components = root
        .entry("components")
        .or_insert_with(|| Value::Object(Map::new()));

    if let Some(components) = components.as_object_mut() {
        let schemes = components
            .entry("securitySchemes")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(schemes) = schemes.as_object_mut() {
            schemes.insert(
                "bearerAuth".to_string(),
                json!({
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                }),
            );
        }
    }
}

fn ensure_servers(doc: &mut Value, port: u16) {
    let server_url = format!("http://localhost:{}", port);

    match doc.get_mut("servers") {
        Some(Value::Array(arr)) => {
            let has = arr.iter().any(|v| v.get("url").and_then(Value::as_str) == Some(server_url.as_str()));
            if !has {
                arr.push(json!({ "url": server_url }));
            }
        }
        _ => {
            doc["servers"] = json!([{ "url": server_url }]);
        }
    }
}
