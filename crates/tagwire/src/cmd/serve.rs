use std::path::Path;
use std::sync::Arc;

use tagwire_dispatch::Dispatcher;
use tagwire_schema::SchemaRegistry;
use tagwire_session::{connect_with_config, SessionConfig, SessionListener};
use tagwire_transport::Endpoint;
use tracing::{info, warn};

use crate::cmd::{parse_endpoint, ServeArgs};
use crate::exit::{schema_error, session_error, CliError, CliResult, INTERNAL, INTERRUPTED, SUCCESS};

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let endpoint = parse_endpoint(&args.endpoint)?;
    let dispatcher = build_dispatcher(args.schemas.as_deref())?;
    let config = SessionConfig {
        workers: usize::from(args.workers),
        max_requests: args.max_requests,
        ..SessionConfig::default()
    };

    info!(
        endpoint = %endpoint,
        transport = endpoint.transport_name(),
        workers = args.workers,
        dial_out = args.connect,
        "starting"
    );

    #[cfg(feature = "async")]
    if args.use_async || matches!(endpoint, Endpoint::WebSocket(_)) {
        return serve_async(&endpoint, dispatcher, config, args.connect);
    }

    if args.connect {
        let mut session = connect_with_config(&endpoint, dispatcher, config)
            .map_err(|err| session_error("connect failed", err))?;
        session
            .serve()
            .map_err(|err| session_error("session failed", err))?;
        return Ok(SUCCESS);
    }

    let listener = SessionListener::bind(&endpoint, dispatcher)
        .map_err(|err| session_error("bind failed", err))?
        .with_config(config);
    install_ctrlc_handler(&listener.local_endpoint())?;

    loop {
        let mut session = listener
            .accept()
            .map_err(|err| session_error("accept failed", err))?;

        // A broken connection ends that session only.
        if let Err(err) = session.serve() {
            warn!(session = session.id(), error = %err, "session failed");
        }

        if args.once {
            return Ok(SUCCESS);
        }
    }
}

fn build_dispatcher(schemas: Option<&Path>) -> CliResult<Dispatcher> {
    let dispatcher = tagwire::builtin_dispatcher();
    let Some(dir) = schemas else {
        return Ok(dispatcher);
    };

    let registry = SchemaRegistry::from_directory(dir).map_err(|err| {
        schema_error(&format!("failed loading schemas from {}", dir.display()), err)
    })?;
    info!(dir = %dir.display(), tags = ?registry.tags(), "loaded payload schemas");
    Ok(dispatcher.with_schemas(Arc::new(registry)))
}

fn install_ctrlc_handler(endpoint: &Endpoint) -> CliResult<()> {
    let socket_path = match endpoint {
        Endpoint::Unix(path) => Some(path.clone()),
        Endpoint::Tcp(_) | Endpoint::WebSocket(_) => None,
    };
    ctrlc::set_handler(move || {
        info!("interrupted, shutting down");
        if let Some(path) = &socket_path {
            let _ = std::fs::remove_file(path);
        }
        std::process::exit(INTERRUPTED);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(feature = "async")]
fn serve_async(
    endpoint: &Endpoint,
    dispatcher: Dispatcher,
    config: SessionConfig,
    dial_out: bool,
) -> CliResult<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| crate::exit::io_error("runtime setup failed", err))?;

    let served = runtime.block_on(async {
        let serving = async {
            if dial_out {
                tagwire_session::connect_websocket(endpoint, dispatcher, config)
                    .await
                    .map(|_| ())
                    .map_err(|err| session_error("session failed", err))
            } else {
                tagwire_session::serve_endpoint_async(endpoint, dispatcher, config)
                    .await
                    .map_err(|err| session_error("serve failed", err))
            }
        };
        tokio::select! {
            result = serving => result,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, shutting down");
                Ok(())
            }
        }
    });

    if let Endpoint::Unix(path) = endpoint {
        let _ = std::fs::remove_file(path);
    }
    served.map(|()| SUCCESS)
}
