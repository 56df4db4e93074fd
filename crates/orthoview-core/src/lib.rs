pub mod error;
pub mod consts;
pub mod config;
pub mod event;
pub mod observe;
pub mod model;
pub mod coords;
pub mod source;
pub mod resource;
pub mod slice;
pub mod navigation;
pub mod coordinator;
pub mod property;
