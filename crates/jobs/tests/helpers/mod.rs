#![allow(dead_code)]
pub mod mock_service;

pub use mock_service::MockSubscriptionService;
