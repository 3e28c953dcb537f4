use salvo::prelude::*;
use serde_json::json;

use crate::web::web_state;

#[handler]
pub async fn health_check(res: &mut Response) {
    res.render(Json(json!({ "ok": true })));
}

#[handler]
pub async fn get_status(res: &mut Response) {
    let state = web_state();

    res.render(Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "groups": state.pipeline.group_count(),
        "routing_rules": state.pipeline.rule_count(),
    })));
}
