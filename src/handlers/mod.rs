pub mod cart;
pub mod orders;
pub mod payments;

use actix_web::web;

use crate::errors::AppError;

/// Malformed JSON bodies get the same `{"error": ...}` shape as every other
/// client error.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| {
            AppError::BadRequest(format!("Invalid request body: {err}")).into()
        })
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/checkout", web::post().to(orders::checkout))
        .service(
            web::scope("/orders")
                .route("", web::get().to(orders::list_orders))
                .route("/{id}/status", web::get().to(orders::order_status))
                .route("/{id}/status", web::patch().to(orders::update_order_status)),
        )
        .service(
            web::scope("/payments")
                .route("/verify", web::post().to(payments::verify_payment))
                .route("/webhook", web::post().to(payments::payment_webhook)),
        )
        .service(
            web::scope("/cart")
                .route("", web::get().to(cart::get_cart))
                .route("/items", web::post().to(cart::add_cart_item))
                .route("/items/{id}", web::delete().to(cart::remove_cart_item)),
        );
}
