pub mod block_tag;
pub mod receipt;
