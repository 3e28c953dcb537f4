use salvo::prelude::*;
use serde_json::json;

use crate::web::web_state;

fn render_error(res: &mut Response, status: StatusCode, message: &str) {
    res.status_code(status);
    res.render(Json(json!({ "error": message })));
}

fn non_empty_query(req: &mut Request, name: &str) -> Option<String> {
    req.query::<String>(name).filter(|value| !value.is_empty())
}

// GET /events?group=&url=&tz=. Selector problems are the caller's fault
// (400); upstream fetch failures are reported inside the body per group.
#[handler]
pub async fn list_events(req: &mut Request, res: &mut Response) {
    let group = non_empty_query(req, "group");
    let url = non_empty_query(req, "url");
    let tz = non_empty_query(req, "tz");

    let pipeline = &web_state().pipeline;
    let targets = match pipeline.select(group.as_deref(), url.as_deref(), tz.as_deref()) {
        Ok(targets) => targets,
        Err(err) => {
            render_error(res, StatusCode::BAD_REQUEST, &err.to_string());
            return;
        }
    };

    let report = pipeline.collect(targets).await;
    res.render(Json(report));
}
