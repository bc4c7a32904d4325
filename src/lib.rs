pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod proctor;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::database::QuizStore;
use crate::services::{attempt_service::AttemptService, quiz_service::QuizService};
use crate::utils::time::{Clock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub attempt_service: AttemptService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn QuizStore>, jwt_secret: &str) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), jwt_secret)
    }

    pub fn with_clock(store: Arc<dyn QuizStore>, clock: Arc<dyn Clock>, jwt_secret: &str) -> Self {
        let quiz_service = QuizService::new(store.clone(), clock.clone());
        let attempt_service = AttemptService::new(store, clock);

        Self {
            quiz_service,
            attempt_service,
            jwt_secret: Arc::from(jwt_secret),
        }
    }
}
