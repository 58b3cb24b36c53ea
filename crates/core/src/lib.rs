pub mod event;
pub mod storage;
