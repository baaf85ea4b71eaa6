pub mod cluster;
pub mod messages;
pub mod storage;
pub mod users;
