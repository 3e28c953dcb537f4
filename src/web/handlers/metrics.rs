use salvo::prelude::*;
use serde_json::json;

use crate::web::metrics::snapshot;
use crate::web::web_state;

#[handler]
pub async fn get_metrics(res: &mut Response) {
    let uptime_seconds = web_state().started_at.elapsed().as_secs();

    let metrics_payload = json!({
        "service": {
            "status": "running",
            "uptime_seconds": uptime_seconds,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "pipeline": snapshot(),
    });

    res.render(Json(metrics_payload));
}
