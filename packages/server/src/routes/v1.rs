use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/files", file_routes(config))
        .nest("/admin", admin_routes())
}

fn file_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::file::upload_file))
        .layer(handlers::file::upload_body_limit(config.file.max_upload_size));

    let read = OpenApiRouter::new()
        .routes(routes!(handlers::file::download_file))
        .routes(routes!(handlers::file::get_file_metadata));

    upload.merge(read)
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::admin::run_gc))
}
