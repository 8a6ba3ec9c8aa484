use ntex::web;
use ntex::http::header;

use crate::controllers;
use crate::models::DaemonConfig;

/// Headers added to every response so browsers from any origin can call us
pub fn cors_headers() -> web::middleware::DefaultHeaders {
  web::middleware::DefaultHeaders::new()
    .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
}

pub async fn start(config: DaemonConfig) -> std::io::Result<()> {
  let hosts = config.hosts.to_owned();
  let workers = config.workers;
  let mut server = web::HttpServer::new(move || {
    web::App::new()
      // bind config state
      .state(config.clone())
      // Default logger middleware
      .wrap(web::middleware::Logger::default())
      // Allow browsers from any origin
      .wrap(cors_headers())
      // bind controller system
      .configure(controllers::system::ntex_config)
      // bind controller pdf
      .configure(controllers::pdf::ntex_config)
      // bind controller convert
      .configure(controllers::convert::ntex_config)
  });
  let mut bound = 0;
  for host in &hosts {
    if let Some(addr) = host.strip_prefix("unix://") {
      server = match server.bind_uds(addr) {
        Err(err) => {
          log::error!("unable to bind server on {} got error {}", addr, &err);
          std::process::exit(1);
        }
        Ok(server) => server,
      };
      log::info!("listening on {}", host);
      bound += 1;
    } else if let Some(addr) = host.strip_prefix("tcp://") {
      server = match server.bind(addr) {
        Err(err) => {
          log::error!("unable to bind server on {} got error {}", addr, &err);
          std::process::exit(1);
        }
        Ok(server) => server,
      };
      log::info!("listening on {}", host);
      bound += 1;
    } else {
      log::warn!("{} is not valid use tcp:// or unix:// as protocol", host);
    }
  }
  if bound == 0 {
    log::error!("no valid host to listen on");
    std::process::exit(1);
  }
  log::info!("http server started with {} workers", workers);
  server.workers(workers).run().await
}
