use std::convert::Infallible;
use std::sync::Arc;

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use clap::Parser;
use log::{error, info};
use warp::{http::header, Filter, Reply};

mod accounts;
mod args;
mod backend;
mod graphql;
mod password;
mod session;
mod time;
mod user;

use crate::accounts::Accounts;
use crate::args::Args;
use crate::backend::Backend;
use crate::graphql::AccountSchema;
use crate::session::Session;
pub use crate::time::Timestamp;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    pretty_env_logger::init();

    let addr = match args.addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("invalid listen address: {e}");
            return;
        }
    };

    let backend = Backend::new(args.data_dir()).await;
    let accounts = Arc::new(Accounts::new(backend));
    let schema = graphql::schema(accounts);

    let secure = args.secure();
    let graphql_post = warp::path!("graphql")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(session::SESSION_COOKIE))
        .and(async_graphql_warp::graphql(schema))
        .and_then(
            move |cookie: Option<String>,
                  (schema, request): (AccountSchema, async_graphql::Request)| async move {
                let session = Session::from_cookie(cookie.as_deref());

                let response = schema.execute(request.data(session.clone())).await;
                let reply = warp::reply::json(&response);

                Ok::<_, Infallible>(match session.issued() {
                    Some(id) => warp::reply::with_header(
                        reply,
                        header::SET_COOKIE,
                        session::set_cookie(&id, secure),
                    )
                    .into_response(),
                    None => reply.into_response(),
                })
            },
        );

    let playground = warp::path!("graphql").and(warp::get()).map(|| {
        warp::reply::html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
    });

    let routes = playground.or(graphql_post).with(warp::log("accountd"));

    info!("listening on {addr}");

    warp::serve(routes).run(addr).await;
}
