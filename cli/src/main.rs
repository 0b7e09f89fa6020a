use std::{path::PathBuf, sync::Arc};

use async_std::task;
use clap::Parser;
use core_types::{
    events::{NoticeLevel, PipelineEvent},
    PipelineStage,
};
use service::{
    app_services::AppServices,
    select_sheet::Command,
    settings::{load_authorization, Settings},
};
use upload_transport::SelectedFile;

mod logging;
mod table;

use table::TextGridRenderer;

#[derive(Parser, Debug)]
#[command(name = "dataprep-upload")]
struct Cli {
    /// File to upload (csv, txt, xls, xlsx or json)
    file: PathBuf,

    /// Base URL of the data preparation API, overrides DATAPREP_API_URL
    #[arg(long)]
    api_url: Option<String>,

    /// Column delimiter to parse the preview with
    #[arg(long)]
    delimiter: Option<String>,

    /// Sheet to show once the preview is ready (0-based)
    #[arg(long)]
    sheet: Option<usize>,

    /// Continue to dataset creation after the preview
    #[arg(long)]
    next: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = logging::init_logging();
    let args = Cli::parse();
    task::block_on(upload(args))
}

async fn upload(args: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(api_url) = &args.api_url {
        settings = settings.with_api_url(api_url);
    }
    let services = AppServices::new(Arc::new(settings), load_authorization()?);

    let (events_tx, events_rx) = async_std::channel::unbounded();
    let (mut coordinator, transport_rx) =
        services.create_coordinator(Arc::new(TextGridRenderer), events_tx)?;

    let file = SelectedFile::from_path(&args.file).await?;
    tracing::info!(file = %file.name, size = file.size, "Uploading file");
    if let Err(rejection) = coordinator.add_files(vec![file]) {
        return Err(rejection.notice().message.into());
    }

    let (command_tx, command_rx) = flume::unbounded();
    let runner = task::spawn(async move {
        coordinator.run(transport_rx, command_rx).await;
        coordinator
    });

    let mut failed = false;
    while let Ok(event) = events_rx.recv().await {
        match event {
            PipelineEvent::UploadProgress { percent } => println!("Uploading: {}%", percent),
            PipelineEvent::StageChanged(PipelineStage::PreviewReady) => {
                if let Some(delimiter) = &args.delimiter {
                    command_tx.send(Command::ChangeDelimiter(delimiter.clone()))?;
                }
                if let Some(sheet) = args.sheet {
                    command_tx.send(Command::SelectSheet(sheet))?;
                }
                if args.next {
                    command_tx.send(Command::Advance)?;
                }
                command_tx.send(Command::Close)?;
            }
            PipelineEvent::StageChanged(PipelineStage::Cancelled) => break,
            PipelineEvent::StageChanged(stage) => println!("{}...", stage),
            PipelineEvent::Notice(notice) => {
                println!("[{}] {}", notice.level, notice.message);
                if notice.level == NoticeLevel::Error {
                    failed = true;
                    command_tx.send(Command::Close)?;
                }
            }
            PipelineEvent::AdvanceRequested {
                dataset_kind,
                descriptor,
            } => {
                println!("Ready to create a {} dataset:", dataset_kind);
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
            }
            PipelineEvent::Loading(_)
            | PipelineEvent::GridRendered { .. }
            | PipelineEvent::GridCleared => {}
        }
    }

    let coordinator = runner.await;
    tracing::debug!(stage = %coordinator.stage(), "Upload finished");
    if failed {
        return Err("upload did not complete".into());
    }
    Ok(())
}
