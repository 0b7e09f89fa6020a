use std::sync::{Arc, OnceLock};

use async_std::channel::Sender;
use core_types::events::{PipelineEvent, TransportEvent};
use dataset_client::{DatasetServiceOps, HttpDatasetService};
use upload_transport::{HttpChunkedTransport, TransportConfig};

use crate::{
    error::Error,
    renderer::GridRenderer,
    select_sheet::PipelineCoordinator,
    settings::{Settings, load_authorization},
};

/// Loads settings and the login token, then builds the services on top of them.
pub fn create_app_services() -> Result<Arc<AppServices>, Error> {
    let settings = Settings::from_env()?;
    let authorization = load_authorization()?;
    Ok(Arc::new(AppServices::new(Arc::new(settings), authorization)))
}

/// HTTP backed services sharing one configuration.
pub struct AppServices {
    settings: Arc<Settings>,
    authorization: Option<String>,
    dataset: OnceLock<Arc<HttpDatasetService>>,
}

impl AppServices {
    pub fn new(settings: Arc<Settings>, authorization: Option<String>) -> Self {
        Self {
            settings,
            authorization,
            dataset: OnceLock::new(),
        }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }

    pub fn dataset_service(&self) -> Result<Arc<HttpDatasetService>, Error> {
        if let Some(service) = self.dataset.get() {
            return Ok(service.clone());
        }
        let service = Arc::new(HttpDatasetService::new(
            self.settings.dataset_endpoints(),
            self.authorization.as_deref(),
        )?);
        Ok(self.dataset.get_or_init(|| service).clone())
    }

    /// A coordinator uploading over HTTP. Transport callbacks arrive on the returned
    /// receiver and are meant for `PipelineCoordinator::run`.
    pub fn create_coordinator(
        &self,
        renderer: Arc<dyn GridRenderer>,
        events: Sender<PipelineEvent>,
    ) -> Result<(PipelineCoordinator, flume::Receiver<TransportEvent>), Error> {
        let (transport_tx, transport_rx) = flume::unbounded();
        let transport = HttpChunkedTransport::new(
            TransportConfig {
                url: self.settings.upload_url(),
                chunk_size: self.settings.chunk_size,
                authorization: self.authorization.clone(),
            },
            transport_tx,
        )?;
        let dataset: Arc<dyn DatasetServiceOps> = self.dataset_service()?;
        let coordinator = PipelineCoordinator::new(
            &self.settings,
            Arc::new(transport),
            dataset,
            renderer,
            events,
        );
        Ok((coordinator, transport_rx))
    }
}
