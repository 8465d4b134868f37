use axum::extract::DefaultBodyLimit;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::extractors::json::MAX_JSON_BODY_BYTES;
use crate::handlers::{grenade, healthcheck, image};
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    let json = OpenApiRouter::new()
        .routes(routes!(healthcheck::healthcheck))
        .routes(routes!(grenade::list_grenades, grenade::create_grenade))
        .routes(routes!(
            grenade::get_grenade,
            grenade::update_grenade,
            grenade::delete_grenade
        ))
        .routes(routes!(image::list_images))
        .routes(routes!(image::get_image, image::delete_image))
        .layer(DefaultBodyLimit::max(MAX_JSON_BODY_BYTES));

    let upload = OpenApiRouter::new()
        .routes(routes!(image::upload_image))
        .layer(image::upload_body_limit());

    json.merge(upload)
}
