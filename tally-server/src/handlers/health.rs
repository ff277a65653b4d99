use tally_common::db::DbThreadPool;

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::env;

#[derive(Deserialize)]
pub struct HealthKeyQuery {
    pub key: Option<String>,
}

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    db_thread_pool: web::Data<DbThreadPool>,
    query: web::Query<HealthKeyQuery>,
) -> impl Responder {
    if !is_health_key_correct(query.key.as_deref(), &env::CONF.health_endpoint_key) {
        return HttpResponse::Unauthorized().finish();
    }

    let pool_state = db_thread_pool.state();
    let resp_body = json!({
        "db_thread_pool_state": {
            "connections": pool_state.connections,
            "idle_connections": pool_state.idle_connections
        }
    });

    HttpResponse::Ok().json(resp_body)
}

#[inline]
fn is_health_key_correct(key: Option<&str>, correct_key: &str) -> bool {
    let Some(key) = key else {
        return false;
    };

    let correct_key = correct_key.as_bytes();
    let key = key.as_bytes();

    if correct_key.len() != key.len() || key.is_empty() {
        return false;
    }

    // Do bitwise comparison to prevent timing attacks
    let keys_dont_match = correct_key
        .iter()
        .zip(key.iter())
        .fold(0u8, |acc, (correct_byte, byte)| acc | (correct_byte ^ byte));

    keys_dont_match == 0
}
