//! # REST + WebSocket API
//!
//! Builds the axum router that exposes the hosted token instance over HTTP.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                           |
//! |--------|------------------------|---------------------------------------|
//! | GET    | `/health`              | Liveness probe                        |
//! | GET    | `/status`              | Token metadata and supply summary     |
//! | POST   | `/rpc`                 | JSON-RPC 2.0 gateway                  |
//! | GET    | `/ws`                  | WebSocket for newly committed events  |
//! | GET    | `/accounts/:address`   | Balance and holder flag               |
//! | GET    | `/holders`             | Holder balances in first-holder order |
//! | GET    | `/withdrawals/:counter`| Withdrawal record                     |
//! | GET    | `/events`              | Event log, `?type=` and `?from=`      |
//!
//! Mutating JSON-RPC methods, `token_deploy` included, carry a `caller`
//! field. The node trusts it as the identity an upstream signer has already
//! authenticated.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use bank_token::{
    Address, DeploymentReceipt, ErrorKind, EventType, LedgerError, LedgerHandle, LoggedEvent,
    Operation, Receipt, TokenConfig, TransferPolicy,
};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The hosted token instance.
    pub ledger: LedgerHandle,
    /// Broadcast channel carrying every newly committed ledger event.
    pub event_tx: broadcast::Sender<LoggedEvent>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Runs one mutating operation through the ledger, recording metrics
    /// and publishing the resulting event on success.
    ///
    /// Publication happens while the ledger still holds its write lock, so
    /// subscribers receive events in log order.
    pub fn execute(&self, caller: &Address, operation: Operation) -> Result<Receipt, LedgerError> {
        let started = Instant::now();
        let outcome = self.ledger.execute_then(caller, operation, |token, receipt| {
            self.metrics.observe(token);
            if let Some(event) = token.events().get(receipt.event_index) {
                // A send error only means there are no subscribers.
                let _ = self.event_tx.send(event.clone());
            }
        });
        self.metrics
            .operation_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        match outcome {
            Ok((receipt, ())) => {
                self.metrics.operations_committed_total.inc();
                Ok(receipt)
            }
            Err(err) => {
                self.metrics.record_rejection(err.kind());
                Err(err)
            }
        }
    }

    /// Replaces the hosted instance on behalf of `caller`, who must own the
    /// current one.
    pub fn redeploy(
        &self,
        caller: &Address,
        config: TokenConfig,
    ) -> Result<DeploymentReceipt, LedgerError> {
        match self.ledger.redeploy(caller, config) {
            Ok(receipt) => {
                self.ledger.read(|token| self.metrics.observe(token));
                Ok(receipt)
            }
            Err(err) => {
                self.metrics.record_rejection(err.kind());
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/holders", get(holders_handler))
        .route("/withdrawals/:counter", get(withdrawal_handler))
        .route("/events", get(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Named method parameters.
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    fn invalid_params(message: impl std::fmt::Display) -> Self {
        Self {
            code: -32602,
            message: format!("Invalid params: {}", message),
            data: None,
        }
    }

    fn internal(message: impl std::fmt::Display) -> Self {
        Self {
            code: -32603,
            message: format!("Internal error: {}", message),
            data: None,
        }
    }
}

impl From<LedgerError> for JsonRpcError {
    fn from(err: LedgerError) -> Self {
        Self {
            code: ledger_error_code(err.kind()),
            message: err.to_string(),
            data: Some(serde_json::json!({ "kind": err.kind().as_str() })),
        }
    }
}

/// Application error codes for ledger rejections.
pub fn ledger_error_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Unauthorized => -32010,
        ErrorKind::DuplicateTransaction => -32011,
        ErrorKind::CapExceeded => -32012,
        ErrorKind::InsufficientBalance => -32013,
        ErrorKind::NotFound => -32014,
        ErrorKind::InvalidState => -32015,
        ErrorKind::RecipientNotHolder => -32016,
        ErrorKind::SupplyOverflow => -32017,
    }
}

type RpcResult = Result<Value, JsonRpcError>;

// ---------------------------------------------------------------------------
// JSON-RPC Params
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployParams {
    caller: Address,
    owner: Address,
    symbol: Option<String>,
    name: Option<String>,
    holder_cap: Option<u64>,
    transfer_policy: Option<TransferPolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DepositParams {
    caller: Address,
    to: Address,
    amount: u64,
    external_id: String,
    bank_transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct TransferParams {
    caller: Address,
    from: Address,
    to: Address,
    amount: u64,
}

#[derive(Debug, Deserialize)]
struct RequestWithdrawalParams {
    caller: Address,
    withdrawer: Address,
    amount: u64,
}

#[derive(Debug, Deserialize)]
struct ResolveWithdrawalParams {
    caller: Address,
    counter: u64,
}

#[derive(Debug, Deserialize)]
struct AddressParams {
    address: Address,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BankTransactionParams {
    bank_transaction_id: String,
}

#[derive(Debug, Deserialize)]
struct CounterParams {
    counter: u64,
}

#[derive(Debug, Deserialize)]
struct GetEventsParams {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    from: u64,
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null)).map_err(JsonRpcError::invalid_params)
}

fn to_json<T: Serialize>(value: &T) -> RpcResult {
    serde_json::to_value(value).map_err(JsonRpcError::internal)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    pub contract_address: String,
    pub owner: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub total_supply: u64,
    pub holder_cap: u64,
    pub transfer_policy: TransferPolicy,
    /// Next withdrawal counter.
    pub withdrawal_counter: u64,
    pub pending_withdrawals: u64,
    pub event_count: u64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    /// Normalized account address.
    pub address: String,
    pub balance: u64,
    /// Whether the address has ever received tokens.
    pub holder: bool,
}

/// One entry of `GET /holders` and `token_holderBalances`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HolderBalance {
    pub address: String,
    pub balance: u64,
}

/// Query string for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub from: Option<u64>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: token metadata and supply summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let resp = state.ledger.read(|token| StatusResponse {
        version: state.version.clone(),
        contract_address: token.contract_address().to_string(),
        owner: token.owner().to_string(),
        symbol: token.symbol().to_string(),
        name: token.name().to_string(),
        decimals: token.decimals(),
        total_supply: token.total_supply(),
        holder_cap: token.config().holder_cap,
        transfer_policy: token.config().transfer_policy,
        withdrawal_counter: token.withdrawal_counter(),
        pending_withdrawals: token.pending_withdrawals().count() as u64,
        event_count: token.events().len() as u64,
        timestamp: chrono::Utc::now().to_rfc3339(),
    });
    Json(resp)
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
///
/// Unknown methods return error code -32601 (Method not found). Ledger
/// rejections carry an application code and the error kind in `data`.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code: -32600,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            }),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params) {
        Ok(value) => (Some(value), None),
        Err(err) => (None, Some(err)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

fn dispatch(state: &AppState, method: &str, params: Option<Value>) -> RpcResult {
    match method {
        // -- Deployment ------------------------------------------------------
        "token_deploy" => {
            let p: DeployParams = parse_params(params)?;
            let mut config = TokenConfig::new(p.owner);
            if let Some(symbol) = p.symbol {
                config = config.with_symbol(symbol);
            }
            if let Some(name) = p.name {
                config = config.with_name(name);
            }
            if let Some(cap) = p.holder_cap {
                config = config.with_holder_cap(cap);
            }
            if let Some(policy) = p.transfer_policy {
                config = config.with_transfer_policy(policy);
            }
            to_json(&state.redeploy(&p.caller, config)?)
        }

        // -- Mutations -------------------------------------------------------
        "token_deposit" => {
            let p: DepositParams = parse_params(params)?;
            let op = Operation::Deposit {
                to: p.to,
                amount: p.amount,
                external_id: p.external_id,
                bank_transaction_id: p.bank_transaction_id,
            };
            to_json(&state.execute(&p.caller, op)?)
        }
        "token_transfer" => {
            let p: TransferParams = parse_params(params)?;
            let op = Operation::Transfer {
                from: p.from,
                to: p.to,
                amount: p.amount,
            };
            to_json(&state.execute(&p.caller, op)?)
        }
        "token_requestWithdrawal" => {
            let p: RequestWithdrawalParams = parse_params(params)?;
            let op = Operation::RequestWithdrawal {
                withdrawer: p.withdrawer,
                amount: p.amount,
            };
            to_json(&state.execute(&p.caller, op)?)
        }
        "token_confirmWithdrawal" => {
            let p: ResolveWithdrawalParams = parse_params(params)?;
            let op = Operation::ConfirmWithdrawal { counter: p.counter };
            to_json(&state.execute(&p.caller, op)?)
        }
        "token_rejectWithdrawal" => {
            let p: ResolveWithdrawalParams = parse_params(params)?;
            let op = Operation::RejectWithdrawal { counter: p.counter };
            to_json(&state.execute(&p.caller, op)?)
        }

        // -- Queries ---------------------------------------------------------
        "token_balanceOf" => {
            let p: AddressParams = parse_params(params)?;
            Ok(state.ledger.read(|t| t.balance_of(&p.address)).into())
        }
        "token_totalSupply" => Ok(state.ledger.read(|t| t.total_supply()).into()),
        "token_isHolder" => {
            let p: AddressParams = parse_params(params)?;
            Ok(state.ledger.read(|t| t.is_holder(&p.address)).into())
        }
        "token_hasBankTransactionId" => {
            let p: BankTransactionParams = parse_params(params)?;
            Ok(state
                .ledger
                .read(|t| t.has_bank_transaction_id(&p.bank_transaction_id))
                .into())
        }
        "token_hasConfirmedWithdrawal" => {
            let p: CounterParams = parse_params(params)?;
            Ok(state
                .ledger
                .read(|t| t.has_confirmed_withdrawal(p.counter))
                .into())
        }
        "token_withdrawalCounter" => Ok(state.ledger.read(|t| t.withdrawal_counter()).into()),
        "token_holderBalances" => to_json(&holder_balances(state)),
        "token_getEvents" => {
            let p: GetEventsParams = parse_params(params)?;
            let event_type: EventType = p
                .event_type
                .parse()
                .map_err(JsonRpcError::invalid_params)?;
            let events: Vec<LoggedEvent> = state
                .ledger
                .read(|t| t.get_events(event_type, p.from).cloned().collect());
            to_json(&events)
        }
        "token_symbol" => Ok(state.ledger.read(|t| t.symbol().to_string()).into()),
        "token_name" => Ok(state.ledger.read(|t| t.name().to_string()).into()),
        "token_decimals" => Ok(state.ledger.read(|t| t.decimals()).into()),

        _ => Err(JsonRpcError {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }),
    }
}

fn holder_balances(state: &AppState) -> Vec<HolderBalance> {
    state.ledger.read(|token| {
        token
            .holder_balances()
            .into_iter()
            .map(|(address, balance)| HolderBalance {
                address: address.into(),
                balance,
            })
            .collect()
    })
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive every newly committed ledger event as JSON. The
/// connection is push-only; client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut rx = state.event_tx.subscribe();

    let mut forward = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let payload = match serde_json::to_string(&ev) {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!("failed to serialize ws event: {}", e);
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("ws subscriber lagged by {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut drain = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => drain.abort(),
        _ = &mut drain => forward.abort(),
    }
}

/// `GET /accounts/:address`: balance and holder flag.
///
/// Unknown addresses report a zero balance and `holder: false`.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let address = Address::new(address);
    let (balance, holder) = state
        .ledger
        .read(|token| (token.balance_of(&address), token.is_holder(&address)));
    Json(AccountResponse {
        address: address.into(),
        balance,
        holder,
    })
}

/// `GET /holders`: every holder with its balance.
async fn holders_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(holder_balances(&state))
}

/// `GET /withdrawals/:counter`: a withdrawal record, or 404.
async fn withdrawal_handler(
    Path(counter): Path<u64>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.ledger.read(|token| token.withdrawal(counter).cloned()) {
        Some(record) => (StatusCode::OK, Json(record)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Withdrawal not found: {}", counter),
        ),
    }
}

/// `GET /events`: the event log, optionally filtered by type and start index.
async fn events_handler(
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let event_type = match query.event_type.as_deref().map(str::parse::<EventType>) {
        None => None,
        Some(Ok(t)) => Some(t),
        Some(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let events: Vec<LoggedEvent> = state.ledger.read(|token| match event_type {
        Some(t) => token.get_events(t, from).cloned().collect(),
        None => token.events().entries_from(from).cloned().collect(),
    });
    (StatusCode::OK, Json(events)).into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
