pub mod attendance_fetch;
pub mod config;
pub mod controller;
pub mod feed;
pub mod http_client;
pub mod model;
pub mod normalize;
pub mod persist;
pub mod state;
pub mod tooltip;
pub mod view;
