//! Status API for the traffic controller.
//!
//! Read-only HTTP endpoints exposing what the controller currently
//! knows: connected switches, the learning table, and active
//! mitigations. Nothing here mutates controller state.

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::sync::Arc;

use crate::core::Controller;
use crate::utils::get_current_timestamp;

pub struct ApiState {
    pub controller: Arc<Controller>,
}

/// API configuration function for Actix-web
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/health").route(web::get().to(health_check)))
            .service(web::resource("/switches").route(web::get().to(switches)))
            .service(web::resource("/mac-table").route(web::get().to(mac_table)))
            .service(web::resource("/mitigations").route(web::get().to(mitigations))),
    );
}

/// Health check endpoint response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    timestamp: u64,
}

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: get_current_timestamp(),
    })
}

async fn switches(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.switches())
}

async fn mac_table(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.mac_table())
}

async fn mitigations(state: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(state.controller.mitigations())
}
