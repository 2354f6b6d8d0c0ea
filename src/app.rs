use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::controller::{convert, webhook};
use crate::crypto::WebhookVerifier;
use crate::media::MediaPipeline;
use crate::webhook::{CustomerDirectory, SubscriptionStore};

/// Liveness endpoint
#[tracing::instrument(name = "Liveness check")]
#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("Stripe webhook is live.")
}

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().finish()
}

/// Run the application on a specified TCP listener
/// The `/convert` route is only mounted when a media pipeline is supplied
pub fn run(
    listener: TcpListener,
    verifier: WebhookVerifier,
    customers: Arc<dyn CustomerDirectory>,
    store: Arc<dyn SubscriptionStore>,
    media: Option<MediaPipeline>,
) -> anyhow::Result<Server> {
    // Wrap application data
    let verifier = web::Data::new(verifier);
    let customers: web::Data<dyn CustomerDirectory> = web::Data::from(customers);
    let store: web::Data<dyn SubscriptionStore> = web::Data::from(store);
    let media = media.map(web::Data::new);

    // Start the server
    let server = HttpServer::new(move || {
        let media = media.clone();

        App::new()
            .wrap(Cors::permissive())
            .wrap(TracingLogger::default())
            .app_data(verifier.clone())
            .app_data(customers.clone())
            .app_data(store.clone())
            .service(index)
            .service(health_check)
            .service(webhook::scope())
            .configure(move |cfg| {
                if let Some(media) = media {
                    cfg.app_data(media).service(convert::scope());
                }
            })
    })
    .listen(listener)?
    .run();

    Ok(server)
}
