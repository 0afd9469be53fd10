pub mod s3_store;
pub mod storage_service;

#[cfg(test)]
pub mod memory_store;
