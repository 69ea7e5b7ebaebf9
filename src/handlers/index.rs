// src/handlers/index.rs
use actix_web::{web, HttpResponse};
use super::TelemetryPath;

pub async fn index(telemetry_path: web::Data<TelemetryPath>) -> HttpResponse {
    let body = format!(
        "<html>\n\
         <head><title>SRCDS Exporter</title></head>\n\
         <body>\n\
         <h1>SRCDS Exporter</h1>\n\
         <p><a href=\"{}\">Metrics</a></p>\n\
         </body>\n\
         </html>\n",
        telemetry_path.0
    );
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(body)
}
