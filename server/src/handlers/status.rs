use crate::admin::{AdminCommand, ServerStatus};
use crate::server::{ServerCommand, ServerTx};
use actix_cors::Cors;
use actix_web::error;
use actix_web::{web, HttpResponse, Responder};

pub fn configure_status_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/status")
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET"]),
            )
            .route(web::get().to(get)),
    );
}

async fn get(srv_tx: web::Data<ServerTx>) -> Result<impl Responder, actix_web::Error> {
    let (tx, rx) = tokio::sync::oneshot::channel::<ServerStatus>();

    srv_tx
        .get_ref()
        .send(ServerCommand::Admin(AdminCommand::GetStatus { tx }))
        .map_err(|_| error::ErrorInternalServerError("Internal Server Error"))?;

    let status = rx
        .await
        .map_err(|_| error::ErrorInternalServerError("Receiver await error"))?;

    Ok(HttpResponse::Ok().json(status))
}
