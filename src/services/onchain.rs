use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::constants::INSPECT_SENDER;
use crate::crypto::TransactionSigner;
use crate::error::{AppError, Result};
use crate::rpc::bcs::{CallArg, MoveCall};
use crate::rpc::sui_client::{
    shared_initial_version, MoveCallRequest, ObjectData, ReturnValue, SuiRpc,
    TransactionBlockResponse,
};
use crate::utils::{normalize_address, object_id_bytes};

pub struct OnchainReader {
    rpc: Arc<dyn SuiRpc>,
    package: [u8; 32],
    module_name: String,
    // Initial shared versions never change, so entries live for the process.
    shared_versions: RwLock<HashMap<String, u64>>,
}

pub struct OnchainInvoker {
    rpc: Arc<dyn SuiRpc>,
    signer: Arc<dyn TransactionSigner>,
    package_id: String,
    module_name: String,
    gas_budget: u64,
}

impl OnchainReader {
    pub fn new(rpc: Arc<dyn SuiRpc>, config: &Config) -> Result<Self> {
        let package = object_id_bytes(&config.package_id).ok_or_else(|| {
            AppError::Config(format!("Invalid package id: {}", config.package_id))
        })?;
        Ok(Self {
            rpc,
            package,
            module_name: config.module_name.clone(),
            shared_versions: RwLock::new(HashMap::new()),
        })
    }

    /// Reads an object with owner and content. Missing objects are `NotFound`.
    pub async fn get_object(&self, object_id: &str) -> Result<ObjectData> {
        let response = self.rpc.get_object(object_id).await?;
        match response.data {
            Some(data) => Ok(data),
            None => Err(AppError::NotFound(format!(
                "Object {}: {}",
                object_id,
                response
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no data".to_string())
            ))),
        }
    }

    pub async fn shared_version(&self, object_id: &str) -> Result<u64> {
        let key = normalize_address(object_id);
        if let Some(version) = self.shared_versions.read().await.get(&key) {
            return Ok(*version);
        }

        let data = self.get_object(object_id).await?;
        let version = data
            .owner
            .as_ref()
            .and_then(shared_initial_version)
            .ok_or_else(|| {
                AppError::BadRequest(format!("Object {} is not a shared object", object_id))
            })?;

        self.shared_versions.write().await.insert(key, version);
        Ok(version)
    }

    /// Runs a read-only entry point taking one shared object and returns the
    /// first command's return values. No values means an empty vector.
    pub async fn inspect(&self, function: &str, object_id: &str) -> Result<Vec<ReturnValue>> {
        let id = object_id_bytes(object_id)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid object id: {}", object_id)))?;
        let initial_shared_version = self.shared_version(object_id).await?;

        let call = MoveCall {
            package: self.package,
            module: self.module_name.clone(),
            function: function.to_string(),
            arguments: vec![CallArg::SharedObject {
                id,
                initial_shared_version,
                mutable: false,
            }],
        };

        let results = self
            .rpc
            .dev_inspect(INSPECT_SENDER, &call.to_transaction_kind_base64())
            .await?;
        if let Some(err) = &results.error {
            return Err(AppError::BlockchainRPC(format!("{function} aborted: {err}")));
        }

        Ok(results
            .first_return_values()
            .map(<[ReturnValue]>::to_vec)
            .unwrap_or_default())
    }
}

impl OnchainInvoker {
    pub fn new(rpc: Arc<dyn SuiRpc>, signer: Arc<dyn TransactionSigner>, config: &Config) -> Self {
        Self {
            rpc,
            signer,
            package_id: config.package_id.clone(),
            module_name: config.module_name.clone(),
            gas_budget: config.gas_budget,
        }
    }

    pub fn sender(&self) -> String {
        self.signer.address()
    }

    /// Builds, signs, and executes one move call. A receipt whose status is
    /// not `success` is returned as `AppError::Transaction`.
    pub async fn invoke(
        &self,
        function: &str,
        arguments: Vec<Value>,
    ) -> Result<TransactionBlockResponse> {
        let request = MoveCallRequest {
            signer: self.signer.address(),
            package_object_id: self.package_id.clone(),
            module: self.module_name.clone(),
            function: function.to_string(),
            type_arguments: Vec::new(),
            arguments,
            gas: None,
            gas_budget: self.gas_budget,
        };

        let built = self
            .rpc
            .unsafe_move_call(&request)
            .await
            .map_err(|e| AppError::Transaction(format!("Failed to build {function}: {e}")))?;
        let tx_bytes = STANDARD
            .decode(&built.tx_bytes)
            .map_err(|e| AppError::Transaction(format!("Invalid tx bytes for {function}: {e}")))?;

        let signature = self.signer.sign_transaction(&tx_bytes).await?;
        let receipt = self
            .rpc
            .execute_transaction_block(&built.tx_bytes, vec![signature])
            .await
            .map_err(|e| AppError::Transaction(format!("Failed to execute {function}: {e}")))?;

        receipt.ensure_success()?;
        tracing::info!("{} submitted: {}", function, receipt.digest);
        Ok(receipt)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted node shared by the service tests.

    use super::*;
    use crate::rpc::sui_client::{DevInspectResults, ObjectResponse, TransactionBytes};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MockRpc {
        pub objects: Mutex<HashMap<String, Value>>,
        pub inspections: Mutex<HashMap<(String, String), Value>>,
        pub failing_inspections: Mutex<Vec<String>>,
        pub receipts: Mutex<VecDeque<Result<TransactionBlockResponse>>>,
        pub executed: Mutex<Vec<MoveCallRequest>>,
        pub execute_status: Mutex<Option<String>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockRpc {
        pub(crate) fn shared_object(&self, id: &str, fields: Value) {
            self.objects.lock().expect("lock").insert(
                normalize_address(id),
                serde_json::json!({
                    "data": {
                        "objectId": id,
                        "owner": { "Shared": { "initial_shared_version": 3 } },
                        "content": { "dataType": "moveObject", "type": "0x1::game::Game", "fields": fields }
                    }
                }),
            );
        }

        /// Scripts the return values of `function` on object `id`.
        pub(crate) fn returns(&self, function: &str, id: &str, values: Value) {
            self.inspections
                .lock()
                .expect("lock")
                .insert((function.to_string(), normalize_address(id)), values);
        }

        pub(crate) fn fail_inspection(&self, id: &str) {
            self.failing_inspections
                .lock()
                .expect("lock")
                .push(normalize_address(id));
        }

        pub(crate) fn push_receipt(&self, receipt: Result<TransactionBlockResponse>) {
            self.receipts.lock().expect("lock").push_back(receipt);
        }

        pub(crate) fn executed_functions(&self) -> Vec<String> {
            self.executed
                .lock()
                .expect("lock")
                .iter()
                .map(|call| call.function.clone())
                .collect()
        }

        pub(crate) fn count_calls(&self, method: &str) -> usize {
            self.calls
                .lock()
                .expect("lock")
                .iter()
                .filter(|m| *m == method)
                .count()
        }

        fn record(&self, method: &str) {
            self.calls.lock().expect("lock").push(method.to_string());
        }
    }

    // Reads the function name and object id back out of the kind bytes.
    fn decode_inspection(tx_kind_b64: &str) -> (String, String) {
        let bytes = STANDARD.decode(tx_kind_b64).expect("base64 kind");
        let object_id = format!("0x{}", hex::encode(&bytes[4..36]));
        let module_len = bytes[79] as usize;
        let function_at = 80 + module_len;
        let function_len = bytes[function_at] as usize;
        let function =
            String::from_utf8(bytes[function_at + 1..function_at + 1 + function_len].to_vec())
                .expect("utf8 function");
        (function, object_id)
    }

    #[async_trait::async_trait]
    impl SuiRpc for MockRpc {
        async fn get_object(&self, object_id: &str) -> Result<ObjectResponse> {
            self.record("sui_getObject");
            let value = self
                .objects
                .lock()
                .expect("lock")
                .get(&normalize_address(object_id))
                .cloned()
                .unwrap_or_else(|| serde_json::json!({ "error": { "code": "notExists" } }));
            Ok(serde_json::from_value(value)?)
        }

        async fn dev_inspect(&self, _sender: &str, tx_kind_b64: &str) -> Result<DevInspectResults> {
            self.record("sui_devInspectTransactionBlock");
            let (function, object_id) = decode_inspection(tx_kind_b64);
            if self
                .failing_inspections
                .lock()
                .expect("lock")
                .contains(&object_id)
            {
                return Err(AppError::BlockchainRPC(format!("{function} timed out")));
            }
            let values = self
                .inspections
                .lock()
                .expect("lock")
                .get(&(function, object_id))
                .cloned();
            Ok(match values {
                Some(values) => serde_json::from_value(serde_json::json!({
                    "results": [{ "returnValues": values }]
                }))?,
                None => DevInspectResults::default(),
            })
        }

        async fn unsafe_move_call(&self, call: &MoveCallRequest) -> Result<TransactionBytes> {
            self.record("unsafe_moveCall");
            self.executed.lock().expect("lock").push(call.clone());
            Ok(TransactionBytes {
                tx_bytes: STANDARD.encode(call.function.as_bytes()),
            })
        }

        async fn execute_transaction_block(
            &self,
            _tx_bytes: &str,
            signatures: Vec<String>,
        ) -> Result<TransactionBlockResponse> {
            self.record("sui_executeTransactionBlock");
            assert_eq!(signatures.len(), 1);
            let status = self
                .execute_status
                .lock()
                .expect("lock")
                .clone()
                .unwrap_or_else(|| "success".to_string());
            Ok(serde_json::from_value(serde_json::json!({
                "digest": "EXEC",
                "effects": { "status": { "status": status, "error": "MoveAbort(7)" } }
            }))?)
        }

        async fn get_transaction_block(&self, _digest: &str) -> Result<TransactionBlockResponse> {
            self.record("sui_getTransactionBlock");
            self.receipts
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Err(AppError::BlockchainRPC("transaction not found".into())))
        }
    }

    /// Address bytes rendered the way inspection results carry them.
    pub(crate) fn address_value(byte: u8) -> Value {
        serde_json::json!([vec![byte; 32], "address"])
    }

    pub(crate) fn address_of(byte: u8) -> String {
        format!("0x{}", hex::encode([byte; 32]))
    }

    pub(crate) fn test_signer() -> Arc<dyn TransactionSigner> {
        Arc::new(crate::crypto::Ed25519Signer::from_secret([5_u8; 32]))
    }
}
