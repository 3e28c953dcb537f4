use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use once_cell::sync::OnceCell;
use salvo::prelude::*;
use tracing::info;

use crate::config::Config;
use crate::pipeline::EventPipeline;

pub mod handlers;
pub mod metrics;

use self::handlers::events::list_events;
use self::handlers::health::{get_status, health_check};
use self::handlers::metrics::get_metrics;

#[derive(Clone)]
pub struct WebState {
    pub pipeline: Arc<EventPipeline>,
    pub started_at: Instant,
}

static WEB_STATE: OnceCell<WebState> = OnceCell::new();

pub fn web_state() -> &'static WebState {
    WEB_STATE
        .get()
        .expect("web state is not initialized before handler execution")
}

pub fn create_router() -> Router {
    Router::new()
        .push(Router::with_path("events").get(list_events))
        .push(Router::with_path("health").get(health_check))
        .push(Router::with_path("status").get(get_status))
        .push(Router::with_path("metrics").get(get_metrics))
}

#[derive(Clone)]
pub struct WebServer {
    config: Arc<Config>,
}

impl WebServer {
    pub fn new(config: Arc<Config>, pipeline: Arc<EventPipeline>) -> Self {
        let _ = WEB_STATE.set(WebState {
            pipeline,
            started_at: Instant::now(),
        });

        Self { config }
    }

    pub async fn start(&self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.config.server.bind_address, self.config.server.port
        );
        info!("Starting web server on {}", bind_addr);

        let acceptor = TcpListener::new(bind_addr).bind().await;
        Server::new(acceptor).serve(create_router()).await;

        Ok(())
    }
}
