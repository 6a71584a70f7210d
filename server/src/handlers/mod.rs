use crate::connection::ws_index;
use crate::handlers::status::configure_status_handlers;
use actix_web::web;

mod status;

pub fn root(cfg: &mut web::ServiceConfig) {
    configure_status_handlers(cfg);

    // Editor clients connect on whatever path they were given.
    cfg.service(web::resource("/{path:.*}").route(web::get().to(ws_index)));
}
