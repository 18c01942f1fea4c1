use axum::{extract::State, response::Html, routing::get, Router};
use std::sync::Arc;
use vertexops_common::{Job, ModelEntry};
use vertexops_core::VertexCore;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;background:#f7f7fb;color:#222}\
h1{margin-bottom:0}table{border-collapse:collapse;margin:1rem 0;min-width:40rem}\
th,td{border:1px solid #ccd;padding:.4rem .8rem;text-align:left}th{background:#e8e8f4}\
.stat{display:inline-block;margin-right:2rem;font-size:1.2rem}nav a{margin-right:1rem}";

pub fn routes(core: Arc<VertexCore>) -> Router {
    Router::new().route("/", get(dashboard)).with_state(core)
}

async fn dashboard(State(core): State<Arc<VertexCore>>) -> Html<String> {
    let models = core.model_service.list_models().await;
    let jobs = core.model_service.list_jobs().await;

    Html(render(
        core.vector_store.len(),
        models.values(),
        &jobs,
    ))
}

fn render<'a>(
    vector_count: usize,
    models: impl ExactSizeIterator<Item = &'a ModelEntry>,
    jobs: &[Job],
) -> String {
    let mut html = String::with_capacity(4096);
    let model_count = models.len();

    html.push_str(&format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>VertexOps</title>\
         <style>{}</style></head><body><h1>VertexOps</h1><p>LLMOps Platform (Local MVP)</p>\
         <nav><a href=\"/api\">API info</a><a href=\"/health\">Health</a><a href=\"/metrics\">Metrics</a></nav>\
         <p><span class=\"stat\">Vector records: <b>{}</b></span>\
         <span class=\"stat\">Models: <b>{}</b></span>\
         <span class=\"stat\">Jobs: <b>{}</b></span></p>",
        STYLE,
        vector_count,
        model_count,
        jobs.len()
    ));

    html.push_str("<h2>Models</h2><table><tr><th>ID</th><th>Type</th><th>Status</th><th>Version</th></tr>");
    for model in models {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&model.model_id),
            escape_html(&model.model_type),
            model.status.as_str(),
            model.version
        ));
    }
    html.push_str("</table>");

    html.push_str("<h2>Jobs</h2><table><tr><th>ID</th><th>Kind</th><th>Model</th><th>Status</th><th>Message</th></tr>");
    for job in jobs {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&job.job_id),
            job.kind.as_str(),
            escape_html(&job.model_id),
            job.status.as_str(),
            escape_html(job.message.as_deref().unwrap_or(""))
        ));
    }
    html.push_str("</table></body></html>");

    html
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
