// Adapters layer: concrete sources and the outside systems they talk to.

pub mod ats;
pub mod browser;
pub mod cache;
pub mod gov_feed;
pub mod http;
pub mod job_board;
pub mod registry;
pub mod storage;
