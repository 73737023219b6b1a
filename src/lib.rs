pub mod application;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
mod test_utils;

use std::error::Error;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::checkout::CheckoutService;
use application::confirmation::PaymentConfirmationService;
use application::order_service::OrderService;
use domain::ports::{CartRepository, CatalogRepository, OrderRepository, PaymentGateway};
use handlers::payments::WebhookSettings;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::order_repo::DieselOrderRepository;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Checkout Service",
        description = "Checkout, payment confirmation and stock reconciliation"
    ),
    paths(
        handlers::orders::checkout,
        handlers::orders::list_orders,
        handlers::orders::order_status,
        handlers::orders::update_order_status,
        handlers::payments::verify_payment,
        handlers::payments::payment_webhook,
        handlers::cart::get_cart,
        handlers::cart::add_cart_item,
        handlers::cart::remove_cart_item,
    ),
    components(schemas(
        handlers::orders::CheckoutRequest,
        handlers::orders::CheckoutItemRequest,
        handlers::orders::CheckoutResponse,
        handlers::orders::OrderResponse,
        handlers::orders::OrderLineResponse,
        handlers::orders::OrderStatusResponse,
        handlers::orders::UpdateOrderStatusRequest,
        handlers::payments::VerifyPaymentRequest,
        handlers::payments::VerifyPaymentResponse,
        handlers::payments::WebhookResponse,
        handlers::cart::AddCartItemRequest,
        handlers::cart::CartResponse,
        handlers::cart::CartItemResponse,
        domain::order::OrderStatus,
        domain::order::PaymentStatus,
    )),
    tags(
        (name = "orders", description = "Checkout and order tracking"),
        (name = "payments", description = "Payment confirmation"),
        (name = "cart", description = "Server-side cart"),
    )
)]
pub struct ApiDoc;

/// The application services shared by every worker. The gateway is built
/// once and injected into both checkout and confirmation.
#[derive(Clone)]
pub struct AppState {
    checkout: web::Data<CheckoutService>,
    confirmation: web::Data<PaymentConfirmationService>,
    orders: web::Data<OrderService>,
    carts: web::Data<CartService>,
    webhook: web::Data<WebhookSettings>,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
        webhook_signature_header: String,
    ) -> Self {
        Self {
            checkout: web::Data::new(CheckoutService::new(
                Arc::clone(&catalog),
                Arc::clone(&carts),
                Arc::clone(&orders),
                Arc::clone(&gateway),
                currency,
            )),
            confirmation: web::Data::new(PaymentConfirmationService::new(
                Arc::clone(&orders),
                gateway,
            )),
            orders: web::Data::new(OrderService::new(orders)),
            carts: web::Data::new(CartService::new(catalog, carts)),
            webhook: web::Data::new(WebhookSettings {
                signature_header: webhook_signature_header,
            }),
        }
    }

    /// Wires the Diesel repositories over `pool`.
    pub fn with_pool(
        pool: DbPool,
        gateway: Arc<dyn PaymentGateway>,
        gateway_config: &config::GatewayConfig,
    ) -> Self {
        Self::new(
            Arc::new(DieselCatalogRepository::new(pool.clone())),
            Arc::new(DieselCartRepository::new(pool.clone())),
            Arc::new(DieselOrderRepository::new(pool)),
            gateway,
            gateway_config.currency.clone(),
            gateway_config.webhook_signature_header.clone(),
        )
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.checkout.clone())
            .app_data(self.confirmation.clone())
            .app_data(self.orders.clone())
            .app_data(self.carts.clone())
            .app_data(self.webhook.clone());
        handlers::routes(cfg);
    }
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/checkout",
            "/orders",
            "/orders/{id}/status",
            "/payments/verify",
            "/payments/webhook",
            "/cart",
            "/cart/items",
            "/cart/items/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
