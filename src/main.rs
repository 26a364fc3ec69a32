use actix_web::middleware::Logger;
use actix_web::web::{Data, Json};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Responder};
use clap::{Arg, Command};
use juniper::http::playground::playground_source;
use juniper::http::GraphQLRequest;
use log::{error, info};
use serde_json::json;
use socialql::engine::config::{Config, Seed};
use socialql::{Engine, ErrorKind};
use std::collections::HashMap;

#[derive(Clone)]
struct AppData {
    engine: Engine,
}

impl AppData {
    fn new(engine: Engine) -> AppData {
        AppData { engine }
    }
}

async fn graphql(data: Data<AppData>, req: HttpRequest, body: Json<GraphQLRequest>) -> HttpResponse {
    let metadata: HashMap<String, String> = req
        .headers()
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|v| (k.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    match data.engine.execute(body.into_inner(), metadata).await {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => {
            let mut builder = match e.kind() {
                ErrorKind::Authentication => HttpResponse::Unauthorized(),
                _ => {
                    error!("graphql request failed: {}", e);
                    HttpResponse::InternalServerError()
                }
            };
            builder.json(json!({
                "errors": [{
                    "message": e.to_string(),
                    "extensions": {"code": e.kind().code()}
                }]
            }))
        }
    }
}

async fn playground() -> impl Responder {
    let html = playground_source("/graphql", None);

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("socialql")
        .version(env!("CARGO_PKG_VERSION"))
        .about("GraphQL server for a social blogging graph")
        .arg(
            Arg::new("CONFIG")
                .help("Path to configuration file to use. Without one, the server starts with defaults and the tutorial data.")
                .required(false),
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("CONFIG") {
        Some(path) => Config::from_file(path)?,
        None => Config {
            seed: Some(Seed::tutorial()?),
            ..Config::default()
        },
    };
    config.auth = config.auth.with_env_overrides()?;

    let addr = config.server.addr();
    let workers = config.server.workers;
    let engine = Engine::new(config)
        .with_version(env!("CARGO_PKG_VERSION").to_string())
        .build()?;
    let app_data = AppData::new(engine);

    info!("socialql listening on http://{}/graphql", addr);
    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(app_data.clone()))
            .wrap(Logger::default())
            .route("/graphql", web::post().to(graphql))
            .route("/playground", web::get().to(playground))
    })
    .workers(workers)
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
