pub mod fixed;
pub mod json_feed;
