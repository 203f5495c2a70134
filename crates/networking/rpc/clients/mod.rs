pub mod eth;

pub use eth::{
    EthClient, RpcResponse,
    errors::{EthClientError, RpcRequestError},
};
