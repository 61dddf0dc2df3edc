use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use gnssviz_core::RecordDispatcher;
use gnssviz_server::{
    ingest::Ingestion, plots::publish, source::SourceReader, status::status_channel, web::Web,
    Cli, VERSION,
};
use log::{error, info};
use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    info!("gnssviz {} starting", VERSION);

    let config = args.playback_config();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return ExitCode::from(EXIT_CONFIG);
    }

    let plots = match args.plot_states() {
        Ok(plots) => plots,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let reader = match SourceReader::open(&config).await {
        Ok(reader) => reader,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let (consumers, board) = publish(plots);
    let mut dispatcher = RecordDispatcher::new();
    for consumer in consumers {
        dispatcher.register(Box::new(consumer));
    }
    let (status_tx, status_rx) = status_channel(&config);
    let (control_tx, control_rx) = mpsc::channel(4);

    let ingestion = Ingestion::new(config, reader, dispatcher, status_tx, control_rx)
        .exit_on_eof(args.exit_on_eof);
    let web = Web::new(args.port, board, status_rx, control_tx);

    let result = Toplevel::new(|s| async move {
        s.start(SubsystemBuilder::new("Ingestion", |a| ingestion.run(a)));
        s.start(SubsystemBuilder::new("Web", |a| web.run(a)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(5))
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
