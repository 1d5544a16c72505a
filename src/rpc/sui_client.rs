use crate::decoder::{decode_u64, render_text};
use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn rpc_request(method: &str, params: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    })
}

fn object_options() -> Value {
    serde_json::json!({
        "showType": true,
        "showOwner": true,
        "showContent": true
    })
}

fn receipt_options() -> Value {
    serde_json::json!({
        "showEffects": true,
        "showEvents": true,
        "showObjectChanges": true
    })
}

fn move_call_params(call: &MoveCallRequest) -> Value {
    serde_json::json!([
        call.signer,
        call.package_object_id,
        call.module,
        call.function,
        call.type_arguments,
        call.arguments,
        call.gas,
        call.gas_budget.to_string()
    ])
}

/// Full-node operations the client depends on.
#[async_trait::async_trait]
pub trait SuiRpc: Send + Sync {
    async fn get_object(&self, object_id: &str) -> Result<ObjectResponse>;

    /// Simulates a BCS-encoded transaction kind without committing it.
    async fn dev_inspect(&self, sender: &str, tx_kind_b64: &str) -> Result<DevInspectResults>;

    /// Builds transaction bytes for a single move call on the node.
    async fn unsafe_move_call(&self, call: &MoveCallRequest) -> Result<TransactionBytes>;

    async fn execute_transaction_block(
        &self,
        tx_bytes: &str,
        signatures: Vec<String>,
    ) -> Result<TransactionBlockResponse>;

    async fn get_transaction_block(&self, digest: &str) -> Result<TransactionBlockResponse>;
}

/// Sui JSON-RPC Client
pub struct SuiClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl SuiClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            client: reqwest::Client::new(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = rpc_request(method, params);
        tracing::debug!("RPC {} -> {}", method, self.rpc_url);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;

        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;

        body.into_result(method)
    }
}

#[async_trait::async_trait]
impl SuiRpc for SuiClient {
    async fn get_object(&self, object_id: &str) -> Result<ObjectResponse> {
        self.call("sui_getObject", serde_json::json!([object_id, object_options()]))
            .await
    }

    async fn dev_inspect(&self, sender: &str, tx_kind_b64: &str) -> Result<DevInspectResults> {
        self.call(
            "sui_devInspectTransactionBlock",
            serde_json::json!([sender, tx_kind_b64, Value::Null, Value::Null]),
        )
        .await
    }

    async fn unsafe_move_call(&self, call: &MoveCallRequest) -> Result<TransactionBytes> {
        self.call("unsafe_moveCall", move_call_params(call)).await
    }

    async fn execute_transaction_block(
        &self,
        tx_bytes: &str,
        signatures: Vec<String>,
    ) -> Result<TransactionBlockResponse> {
        self.call(
            "sui_executeTransactionBlock",
            serde_json::json!([
                tx_bytes,
                signatures,
                receipt_options(),
                "WaitForLocalExecution"
            ]),
        )
        .await
    }

    async fn get_transaction_block(&self, digest: &str) -> Result<TransactionBlockResponse> {
        self.call(
            "sui_getTransactionBlock",
            serde_json::json!([digest, receipt_options()]),
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl<T> RpcResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if let Some(err) = self.error {
            return Err(AppError::BlockchainRPC(format!(
                "{method} failed ({}): {}",
                err.code, err.message
            )));
        }
        self.result
            .ok_or_else(|| AppError::BlockchainRPC(format!("{method} returned no result")))
    }
}

// ==================== OBJECTS ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectResponse {
    #[serde(default)]
    pub data: Option<ObjectData>,
    #[serde(default)]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectData {
    pub object_id: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub owner: Option<Value>,
    #[serde(default)]
    pub content: Option<ObjectContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectContent {
    #[serde(rename = "dataType")]
    pub data_type: String,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub fields: Value,
}

impl ObjectData {
    /// Fields of a Move object, or `None` for packages and missing content.
    pub fn move_fields(&self) -> Option<&Value> {
        self.content
            .as_ref()
            .filter(|content| content.data_type == "moveObject")
            .map(|content| &content.fields)
    }
}

pub fn is_shared_owner(owner: &Value) -> bool {
    owner.get("Shared").is_some()
}

/// `initial_shared_version` of a `{"Shared": {...}}` owner.
pub fn shared_initial_version(owner: &Value) -> Option<u64> {
    owner
        .get("Shared")
        .and_then(|shared| shared.get("initial_shared_version"))
        .and_then(decode_u64)
}

// ==================== INSPECTION ====================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevInspectResults {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Option<Vec<ExecutionResult>>,
}

impl DevInspectResults {
    /// Return values of the first command, if the simulation produced any.
    pub fn first_return_values(&self) -> Option<&[ReturnValue]> {
        self.results
            .as_ref()
            .and_then(|results| results.first())
            .and_then(|result| result.return_values.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(rename = "returnValues", default)]
    pub return_values: Option<Vec<ReturnValue>>,
}

/// One `[bytes, type]` tuple from an inspection result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValue(pub Vec<u8>, pub String);

impl ReturnValue {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn type_tag(&self) -> &str {
        &self.1
    }

    /// The tuple exactly as it appears on the wire.
    pub fn wire_value(&self) -> Value {
        serde_json::json!([self.0, self.1])
    }

    /// Comma-joined rendering, `b0,b1,...,<type>`.
    pub fn as_text(&self) -> String {
        render_text(&self.wire_value())
    }
}

// ==================== TRANSACTIONS ====================

#[derive(Debug, Clone, Serialize)]
pub struct MoveCallRequest {
    pub signer: String,
    pub package_object_id: String,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
    pub gas: Option<String>,
    pub gas_budget: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionBytes {
    #[serde(rename = "txBytes")]
    pub tx_bytes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionBlockResponse {
    pub digest: String,
    #[serde(default)]
    pub effects: Option<TransactionEffects>,
    #[serde(default)]
    pub events: Option<Vec<SuiEvent>>,
    #[serde(rename = "objectChanges", default)]
    pub object_changes: Option<Vec<ObjectChange>>,
}

impl TransactionBlockResponse {
    pub fn events(&self) -> &[SuiEvent] {
        self.events.as_deref().unwrap_or_default()
    }

    pub fn object_changes(&self) -> &[ObjectChange] {
        self.object_changes.as_deref().unwrap_or_default()
    }

    pub fn created(&self) -> &[OwnedObjectRef] {
        self.effects
            .as_ref()
            .and_then(|effects| effects.created.as_deref())
            .unwrap_or_default()
    }

    /// `Err` with the node's reason when execution did not succeed. Effects
    /// are always requested, so a receipt without them is a failure too.
    pub fn ensure_success(&self) -> Result<()> {
        let Some(effects) = &self.effects else {
            return Err(AppError::Transaction(format!(
                "receipt {} carries no effects",
                self.digest
            )));
        };
        if effects.status.status == "success" {
            return Ok(());
        }
        Err(AppError::Transaction(format!(
            "{} ({})",
            effects
                .status
                .error
                .clone()
                .unwrap_or_else(|| effects.status.status.clone()),
            self.digest
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEffects {
    pub status: ExecutionStatus,
    #[serde(default)]
    pub created: Option<Vec<OwnedObjectRef>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStatus {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedObjectRef {
    pub owner: Value,
    pub reference: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(rename = "objectId")]
    pub object_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectChange {
    #[serde(rename = "type")]
    pub change_type: String,
    #[serde(default)]
    pub owner: Option<Value>,
    #[serde(rename = "objectType", default)]
    pub object_type: Option<String>,
    #[serde(rename = "objectId", default)]
    pub object_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "parsedJson", default)]
    pub parsed_json: Value,
    #[serde(default)]
    pub sender: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_request_sets_method_and_id() {
        let req = rpc_request("sui_getObject", serde_json::json!([]));
        assert_eq!(req.get("method").and_then(|v| v.as_str()), Some("sui_getObject"));
        assert_eq!(req.get("id").and_then(|v| v.as_i64()), Some(1));
        assert_eq!(req.get("jsonrpc").and_then(|v| v.as_str()), Some("2.0"));
    }

    #[test]
    fn move_call_params_keep_positional_order() {
        let params = move_call_params(&MoveCallRequest {
            signer: "0xa".to_string(),
            package_object_id: "0xb".to_string(),
            module: "game".to_string(),
            function: "shoot".to_string(),
            type_arguments: vec![],
            arguments: vec![serde_json::json!("0xc"), serde_json::json!(2)],
            gas: None,
            gas_budget: 10,
        });
        assert_eq!(params[0], "0xa");
        assert_eq!(params[3], "shoot");
        assert_eq!(params[5][1], 2);
        assert!(params[6].is_null());
        assert_eq!(params[7], "10");
    }

    #[test]
    fn rpc_error_body_becomes_rpc_error() {
        let body: RpcResponse<Value> = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        }))
        .expect("parse");
        match body.into_result("sui_getObject") {
            Err(AppError::BlockchainRPC(msg)) => assert!(msg.contains("Invalid params")),
            other => panic!("expected BlockchainRPC, got {other:?}"),
        }
    }

    #[test]
    fn dev_inspect_return_values_parse_as_tuples() {
        let results: DevInspectResults = serde_json::from_value(serde_json::json!({
            "effects": {},
            "results": [{
                "returnValues": [[[1], "bool"], [[5, 0, 0, 0, 0, 0, 0, 0], "u64"]]
            }]
        }))
        .expect("parse");
        let values = results.first_return_values().expect("values");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].type_tag(), "bool");
        assert_eq!(values[1].bytes()[0], 5);
        assert_eq!(values[0].as_text(), "1,bool");
    }

    #[test]
    fn shared_owner_helpers() {
        let owner = serde_json::json!({ "Shared": { "initial_shared_version": 42 } });
        assert!(is_shared_owner(&owner));
        assert_eq!(shared_initial_version(&owner), Some(42));
        let owned = serde_json::json!({ "AddressOwner": "0x1" });
        assert!(!is_shared_owner(&owned));
        assert_eq!(shared_initial_version(&owned), None);
    }

    #[test]
    fn failed_effects_surface_as_transaction_error() {
        let receipt: TransactionBlockResponse = serde_json::from_value(serde_json::json!({
            "digest": "9xyz",
            "effects": { "status": { "status": "failure", "error": "MoveAbort(3)" } }
        }))
        .expect("parse");
        match receipt.ensure_success() {
            Err(AppError::Transaction(msg)) => {
                assert!(msg.contains("MoveAbort(3)"));
                assert!(msg.contains("9xyz"));
            }
            other => panic!("expected Transaction error, got {other:?}"),
        }
        assert!(receipt.events().is_empty());
        assert!(receipt.object_changes().is_empty());
    }

    #[test]
    fn receipt_without_effects_is_not_success() {
        let receipt: TransactionBlockResponse =
            serde_json::from_value(serde_json::json!({ "digest": "9abc" })).expect("parse");
        match receipt.ensure_success() {
            Err(AppError::Transaction(msg)) => assert!(msg.contains("9abc")),
            other => panic!("expected Transaction error, got {other:?}"),
        }
    }
}
