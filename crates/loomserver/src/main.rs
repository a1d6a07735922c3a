use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use actix_ws::Message;
use loomcore::{FlowDefinition, Value};
use loomruntime::{CompiledFlow, ExecuteOptions, FlowEngine, NodeRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

/// One registered flow: its definition plus the compiled pipeline
struct FlowRecord {
    definition: FlowDefinition,
    compiled: Arc<CompiledFlow>,
}

/// Application state shared across handlers
struct AppState {
    engine: Arc<FlowEngine>,
    flows: Arc<RwLock<HashMap<Uuid, FlowRecord>>>,
}

/// Request body for flow execution
#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    inputs: HashMap<String, serde_json::Value>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Request body for continuing a session
#[derive(Debug, Deserialize)]
struct ContinueRequest {
    session_id: String,
    #[serde(default)]
    inputs: HashMap<String, serde_json::Value>,
}

/// Response for flow registration
#[derive(Debug, Serialize)]
struct FlowResponse {
    id: Uuid,
    message: String,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn convert_inputs(inputs: HashMap<String, serde_json::Value>) -> HashMap<String, Value> {
    inputs
        .into_iter()
        .map(|(k, v)| (k, Value::from_json(v)))
        .collect()
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "loom"
    }))
}

/// List all registered flows
#[get("/api/flows")]
async fn list_flows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let flows = data.flows.read().await;
    let flow_list: Vec<_> = flows
        .iter()
        .map(|(id, record)| {
            serde_json::json!({
                "id": id,
                "nodes": record.definition.nodes.len(),
                "edges": record.definition.edges.len(),
                "start_nodes": record.compiled.start_nodes,
                "end_nodes": record.compiled.end_nodes,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(flow_list))
}

/// Register and compile a new flow
#[post("/api/flows")]
async fn create_flow(
    data: web::Data<AppState>,
    definition: web::Json<FlowDefinition>,
) -> ActixResult<impl Responder> {
    let definition = definition.into_inner();

    match data.engine.build(&definition) {
        Ok(compiled) => {
            let flow_id = Uuid::new_v4();
            info!("Registered flow {} ({} nodes)", flow_id, compiled.node_count);

            data.flows.write().await.insert(
                flow_id,
                FlowRecord {
                    definition,
                    compiled: Arc::new(compiled),
                },
            );

            Ok(HttpResponse::Created().json(FlowResponse {
                id: flow_id,
                message: "Flow compiled successfully".to_string(),
            }))
        }
        Err(e) => {
            error!("Flow compilation failed: {}", e);
            Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

/// Get a specific flow definition
#[get("/api/flows/{id}")]
async fn get_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let flows = data.flows.read().await;

    match flows.get(&flow_id) {
        Some(record) => Ok(HttpResponse::Ok().json(&record.definition)),
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Flow {} not found", flow_id),
        })),
    }
}

/// Delete a flow
#[actix_web::delete("/api/flows/{id}")]
async fn delete_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let mut flows = data.flows.write().await;

    match flows.remove(&flow_id) {
        Some(_) => {
            info!("Deleted flow: {}", flow_id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Flow deleted successfully"
            })))
        }
        None => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Flow {} not found", flow_id),
        })),
    }
}

/// Validate a flow definition without compiling it
#[post("/api/flows/validate")]
async fn validate_flow(
    data: web::Data<AppState>,
    definition: web::Json<FlowDefinition>,
) -> ActixResult<impl Responder> {
    let report = data.engine.validate(&definition.into_inner());
    Ok(HttpResponse::Ok().json(report))
}

/// Execute a registered flow
#[post("/api/flows/{id}/execute")]
async fn execute_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ExecuteRequest>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let req = req.into_inner();

    let compiled = {
        let flows = data.flows.read().await;
        match flows.get(&flow_id) {
            Some(record) => record.compiled.clone(),
            None => {
                return Ok(HttpResponse::NotFound().json(ErrorResponse {
                    error: format!("Flow {} not found", flow_id),
                }))
            }
        }
    };

    info!("Executing flow: {}", flow_id);

    let report = data
        .engine
        .execute(
            &compiled,
            ExecuteOptions {
                inputs: convert_inputs(req.inputs),
                session_id: req.session_id,
                user_id: req.user_id,
                workflow_id: Some(flow_id.to_string()),
                cancellation: None,
            },
        )
        .await;

    if report.success {
        Ok(HttpResponse::Ok().json(report))
    } else {
        Ok(HttpResponse::UnprocessableEntity().json(report))
    }
}

/// Continue a prior session of a registered flow
#[post("/api/flows/{id}/continue")]
async fn continue_flow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<ContinueRequest>,
) -> ActixResult<impl Responder> {
    let flow_id = path.into_inner();
    let req = req.into_inner();

    let compiled = {
        let flows = data.flows.read().await;
        match flows.get(&flow_id) {
            Some(record) => record.compiled.clone(),
            None => {
                return Ok(HttpResponse::NotFound().json(ErrorResponse {
                    error: format!("Flow {} not found", flow_id),
                }))
            }
        }
    };

    info!("Continuing flow {} session {}", flow_id, req.session_id);

    let report = data
        .engine
        .continue_execution(&compiled, &req.session_id, convert_inputs(req.inputs))
        .await;

    if report.success {
        Ok(HttpResponse::Ok().json(report))
    } else {
        Ok(HttpResponse::UnprocessableEntity().json(report))
    }
}

/// WebSocket endpoint for real-time events
#[get("/api/events")]
async fn websocket_events(
    req: actix_web::HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let (res, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    info!("WebSocket client connected");

    // Subscribe to events
    let mut events = data.engine.event_bus().subscribe();

    // Spawn task to handle WebSocket
    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                // Receive event from engine
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            // Serialize and send event
                            if let Ok(json) = serde_json::to_string(&event) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(_) => break,
                    }
                }

                // Handle incoming WebSocket messages (ping/pong)
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }

                else => break,
            }
        }

        info!("WebSocket client disconnected");
        let _ = session.close(None).await;
    });

    Ok(res)
}

/// List available node types with their classification
#[get("/api/nodes")]
async fn list_node_types(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    let registry = data.engine.registry();
    let classifier = data.engine.classifier();

    let nodes: Vec<_> = registry
        .list_node_types()
        .iter()
        .map(|node_type| {
            let metadata = registry.get_metadata(node_type);
            let classification = classifier.classify(node_type);
            serde_json::json!({
                "type": node_type,
                "description": metadata.as_ref().map(|m| m.description.clone()).unwrap_or_default(),
                "category": metadata.as_ref().map(|m| m.category.clone()).unwrap_or_default(),
                "role": classification.role,
                "is_control_flow": classification.is_control_flow,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(nodes))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("🚀 Starting Loom Server");

    // Create engine with registered nodes
    let mut registry = NodeRegistry::new();
    loomnodes::register_all(&mut registry);

    let engine = Arc::new(FlowEngine::new(Arc::new(registry)));

    info!("✅ Engine initialized with standard nodes");

    // Create app state
    let app_state = web::Data::new(AppState {
        engine,
        flows: Arc::new(RwLock::new(HashMap::new())),
    });

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    // Start HTTP server
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_flows)
            .service(create_flow)
            .service(validate_flow)
            .service(get_flow)
            .service(delete_flow)
            .service(execute_flow)
            .service(continue_flow)
            .service(websocket_events)
            .service(list_node_types)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
