use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    types::{block_tag::BlockTag, receipt::RpcReceipt},
    utils::{RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse},
};
use bytes::Bytes;
use errors::{EthClientError, RpcRequestError};
use hebao_common::{Address, H256, U256, utils::decode_hex};
use reqwest::{Client, Url};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};

pub mod errors;

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RpcResponse {
    Success(RpcSuccessResponse),
    Error(RpcErrorResponse),
}

#[derive(Debug, Clone)]
pub struct EthClient {
    client: Client,
    pub urls: Vec<Url>,
}

impl EthClient {
    pub fn new(url: &str) -> Result<EthClient, EthClientError> {
        Self::new_with_multiple_urls(vec![url.to_string()])
    }

    pub fn new_with_multiple_urls(urls: Vec<String>) -> Result<EthClient, EthClientError> {
        let urls = urls
            .iter()
            .map(|url| {
                Url::parse(url)
                    .map_err(|_| EthClientError::ParseUrlError(format!("Failed to parse {url}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client: Client::new(),
            urls,
        })
    }

    /// Send a request to the RPC. Tries each URL until one succeeds.
    pub async fn send_request(&self, request: RpcRequest) -> Result<RpcResponse, EthClientError> {
        let mut response = Err(EthClientError::FailedAllRPC);

        for url in self.urls.iter() {
            response = self.send_request_to_url(url, &request).await;
            // A node may not implement every method, so an error response
            // from one endpoint still falls through to the next.
            match &response {
                Ok(RpcResponse::Success(_)) => {
                    debug!(endpoint = %url, method = %request.method, "RPC request successful");
                    return response;
                }
                Ok(RpcResponse::Error(err)) => {
                    debug!(endpoint = %url, error = ?err.error, "RPC server returned an error");
                }
                Err(error) => {
                    warn!(endpoint = %url, %error, "Could not request RPC server");
                }
            }
        }

        response
    }

    /// Send a request to **all** RPC URLs.
    ///
    /// Return the first successful response, or the last error if all fail.
    async fn send_request_to_all(
        &self,
        request: RpcRequest,
    ) -> Result<RpcResponse, EthClientError> {
        let mut response = Err(EthClientError::FailedAllRPC);

        for url in self.urls.iter() {
            let maybe_response = self.send_request_to_url(url, &request).await;

            match &maybe_response {
                Ok(RpcResponse::Success(_)) => {
                    debug!(endpoint = %url, "RPC request successful");
                }
                Ok(RpcResponse::Error(err)) => {
                    debug!(endpoint = %url, error = ?err.error, "RPC server returned an error");
                }
                Err(error) => {
                    warn!(endpoint = %url, %error, "Could not request RPC server");
                }
            };

            response = match response {
                Ok(RpcResponse::Success(success)) => Ok(RpcResponse::Success(success)),
                _ => maybe_response,
            };
        }

        response
    }

    async fn send_request_to_url(
        &self,
        rpc_url: &Url,
        request: &RpcRequest,
    ) -> Result<RpcResponse, EthClientError> {
        trace!(endpoint = %rpc_url, ?request, "Sending RPC request");

        self.client
            .post(rpc_url.as_str())
            .header("content-type", "application/json")
            .body(serde_json::ser::to_string(&request).map_err(|error| {
                EthClientError::FailedToSerializeRequestBody(format!("{error}: {request:?}"))
            })?)
            .send()
            .await?
            .json::<RpcResponse>()
            .await
            .inspect(|body| trace!(endpoint = %rpc_url, ?body, "Response deserialized successfully"))
            .map_err(EthClientError::from)
    }

    fn request(method: &str, params: Option<Vec<Value>>) -> RpcRequest {
        RpcRequest::new(
            RpcRequestId::Number(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            method,
            params,
        )
    }

    fn parse_response<T: DeserializeOwned>(
        method: &str,
        response: RpcResponse,
    ) -> Result<T, EthClientError> {
        match response {
            RpcResponse::Success(result) => serde_json::from_value(result.result)
                .map_err(|source| RpcRequestError::SerdeJSONError {
                    method: method.to_string(),
                    source,
                })
                .map_err(EthClientError::from),
            RpcResponse::Error(error_response) => Err(RpcRequestError::RPCError {
                method: method.to_string(),
                message: error_response.error.message,
                data: error_response.error.data.map(|data| data.to_string()),
            }
            .into()),
        }
    }

    fn parse_hex_bytes(method: &str, response: RpcResponse) -> Result<Bytes, EthClientError> {
        let hex_str: String = Self::parse_response(method, response)?;
        decode_hex(&hex_str)
            .map(Bytes::from)
            .map_err(|source| {
                RpcRequestError::HexError {
                    method: method.to_string(),
                    source,
                }
                .into()
            })
    }

    fn parse_quantity(method: &str, response: RpcResponse) -> Result<u64, EthClientError> {
        let hex_str: String = Self::parse_response(method, response)?;
        u64::from_str_radix(hex_str.trim_start_matches("0x"), 16).map_err(|source| {
            RpcRequestError::ParseIntError {
                method: method.to_string(),
                source,
            }
            .into()
        })
    }

    pub async fn send_raw_transaction(&self, data: &[u8]) -> Result<H256, EthClientError> {
        let method = "eth_sendRawTransaction";
        let params = Some(vec![json!(format!("0x{}", hex::encode(data)))]);
        let response = self
            .send_request_to_all(Self::request(method, params))
            .await?;
        Self::parse_response(method, response)
    }

    /// `eth_call` against the latest block, returning the raw return data.
    pub async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        calldata: &[u8],
    ) -> Result<Bytes, EthClientError> {
        let method = "eth_call";
        let mut tx = json!({
            "to": format!("{to:#x}"),
            "input": format!("0x{}", hex::encode(calldata)),
        });
        if let Some(from) = from {
            tx["from"] = json!(format!("{from:#x}"));
        }
        let params = Some(vec![tx, BlockTag::Latest.into()]);
        let response = self.send_request(Self::request(method, params)).await?;
        Self::parse_hex_bytes(method, response)
    }

    pub async fn get_max_priority_fee(&self) -> Result<U256, EthClientError> {
        let method = "eth_maxPriorityFeePerGas";
        let response = self.send_request(Self::request(method, None)).await?;
        Self::parse_response(method, response)
    }

    pub async fn get_gas_price(&self) -> Result<U256, EthClientError> {
        let method = "eth_gasPrice";
        let response = self.send_request(Self::request(method, None)).await?;
        Self::parse_response(method, response)
    }

    pub async fn get_nonce(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<u64, EthClientError> {
        let method = "eth_getTransactionCount";
        let params = Some(vec![json!(format!("{address:#x}")), block.into()]);
        let response = self.send_request(Self::request(method, params)).await?;
        Self::parse_quantity(method, response)
    }

    pub async fn get_block_number(&self) -> Result<u64, EthClientError> {
        let method = "eth_blockNumber";
        let response = self.send_request(Self::request(method, None)).await?;
        Self::parse_quantity(method, response)
    }

    pub async fn get_chain_id(&self) -> Result<u64, EthClientError> {
        let method = "eth_chainId";
        let response = self.send_request(Self::request(method, None)).await?;
        Self::parse_quantity(method, response)
    }

    /// `None` while the transaction is still pending or unknown to the node.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<Option<RpcReceipt>, EthClientError> {
        let method = "eth_getTransactionReceipt";
        let params = Some(vec![json!(format!("{tx_hash:#x}"))]);
        let response = self.send_request(Self::request(method, params)).await?;
        Self::parse_response(method, response)
    }

    pub async fn get_code(
        &self,
        address: Address,
        block: BlockTag,
    ) -> Result<Bytes, EthClientError> {
        let method = "eth_getCode";
        let params = Some(vec![json!(format!("{address:#x}")), block.into()]);
        let response = self.send_request(Self::request(method, params)).await?;
        Self::parse_hex_bytes(method, response)
    }
}
