use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use core_types::events::TransportEvent;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use crate::{MultipartParams, SelectedFile, TransportError, ops::UploadTransportOps};

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    /// Bytes per request. 0 sends the whole file in one request.
    pub chunk_size: u64,
    /// Full `Authorization` header value, e.g. `bearer abc`.
    pub authorization: Option<String>,
}

#[derive(Debug)]
struct QueuedFile {
    file: SelectedFile,
    sent: u64,
}

#[derive(Debug, Default)]
struct TransferState {
    queue: Vec<QueuedFile>,
    params: MultipartParams,
    /// Cleared by `stop`. The transfer task checks it between requests.
    running: bool,
    /// A transfer task exists, possibly still waiting for the request in flight.
    task_alive: bool,
}

struct ChunkRequest {
    file_name: String,
    path: PathBuf,
    params: MultipartParams,
    offset: u64,
    len: u64,
    chunk: Option<(u64, u64)>,
}

/// Chunked multipart upload over HTTP.
///
/// Requests are sent one at a time from a background task. Each carries the current
/// `MultipartParams`, and when chunking the `name`, `chunk` and `chunks` fields. File
/// bytes are streamed from disk, never held in memory as a whole.
pub struct HttpChunkedTransport {
    config: TransportConfig,
    client: reqwest::blocking::Client,
    events: flume::Sender<TransportEvent>,
    state: Arc<Mutex<TransferState>>,
}

impl HttpChunkedTransport {
    pub fn new(
        config: TransportConfig,
        events: flume::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Some(authorization) = &config.authorization {
            let value = HeaderValue::from_str(authorization)
                .map_err(|e| TransportError::Other(format!("Invalid auth header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            config,
            client,
            events,
            state: Arc::new(Mutex::new(TransferState::default())),
        })
    }

    fn lock(&self) -> MutexGuard<'_, TransferState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<TransferState>) -> MutexGuard<'_, TransferState> {
    // a panicking transfer task must not take the control surface down with it
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl UploadTransportOps for HttpChunkedTransport {
    fn add_file(&self, file: SelectedFile) -> Result<(), TransportError> {
        tracing::debug!(file_id = %file.id, name = %file.name, size = file.size, "File queued");
        self.lock().queue.push(QueuedFile { file, sent: 0 });
        Ok(())
    }

    fn remove_file(&self, file_id: &str) {
        self.lock().queue.retain(|q| q.file.id != file_id);
    }

    fn start(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.queue.is_empty() {
            tracing::debug!("Transport ready, nothing queued");
            return Ok(());
        }
        state.running = true;
        if state.task_alive {
            // the task still waiting on its request picks the queue up again
            return Ok(());
        }
        state.task_alive = true;
        drop(state);

        let transfer = Transfer {
            config: self.config.clone(),
            client: self.client.clone(),
            events: self.events.clone(),
            state: self.state.clone(),
        };
        async_std::task::spawn(transfer.run());
        Ok(())
    }

    fn stop(&self) {
        self.lock().running = false;
    }

    fn params(&self) -> MultipartParams {
        self.lock().params.clone()
    }

    fn set_params(&self, params: MultipartParams) {
        self.lock().params = params;
    }
}

struct Transfer {
    config: TransportConfig,
    client: reqwest::blocking::Client,
    events: flume::Sender<TransportEvent>,
    state: Arc<Mutex<TransferState>>,
}

impl Transfer {
    async fn run(self) {
        loop {
            let (file, sent, params) = {
                let mut state = lock_state(&self.state);
                let next = state
                    .queue
                    .first()
                    .map(|queued| (queued.file.clone(), queued.sent));
                match next {
                    Some((file, sent)) if state.running => (file, sent, state.params.clone()),
                    _ => {
                        state.running = false;
                        state.task_alive = false;
                        return;
                    }
                }
            };

            if sent == 0 {
                self.events
                    .send(TransportEvent::FileStarting {
                        file_id: file.id.clone(),
                    })
                    .ok();
            }

            let result = self.send_next_chunk(&file, sent, params).await;

            let mut state = lock_state(&self.state);
            match result {
                Ok((len, body)) => {
                    // a stop during the request still keeps what the server accepted
                    let Some(index) = state.queue.iter().position(|q| q.file.id == file.id)
                    else {
                        tracing::debug!(file_id = %file.id, "File removed while uploading");
                        continue;
                    };
                    let sent = sent + len;
                    let finished = sent >= file.size;
                    if finished {
                        state.queue.remove(index);
                    } else {
                        state.queue[index].sent = sent;
                    }
                    drop(state);

                    self.events
                        .send(TransportEvent::Progress {
                            file_id: file.id.clone(),
                            percent: percent_of(sent, file.size),
                        })
                        .ok();
                    if finished {
                        tracing::info!(file_id = %file.id, "File uploaded");
                        self.events
                            .send(TransportEvent::Uploaded {
                                file_id: file.id.clone(),
                                response: body,
                            })
                            .ok();
                    }
                }
                Err(e) if !state.running => {
                    // paused; the chunk is sent again on resume
                    state.task_alive = false;
                    tracing::debug!(file_id = %file.id, error = %e, "Chunk failed while stopped");
                    return;
                }
                Err(e) => {
                    state.running = false;
                    state.task_alive = false;
                    drop(state);
                    tracing::error!(file_id = %file.id, error = %e, "Chunk upload failed");
                    self.events
                        .send(TransportEvent::Failed {
                            code: e.code(),
                            message: e.to_string(),
                        })
                        .ok();
                    return;
                }
            }
        }
    }

    async fn send_next_chunk(
        &self,
        file: &SelectedFile,
        sent: u64,
        params: MultipartParams,
    ) -> Result<(u64, String), TransportError> {
        let chunk_size = self.config.chunk_size;
        let remaining = file.size.saturating_sub(sent);
        let len = if chunk_size == 0 {
            remaining
        } else {
            chunk_size.min(remaining)
        };
        let chunk = (chunk_size > 0).then(|| (sent / chunk_size, file.size.div_ceil(chunk_size)));
        tracing::debug!(file_id = %file.id, offset = sent, len, ?chunk, "Uploading chunk");

        let request = ChunkRequest {
            file_name: file.name.clone(),
            path: file.path.clone(),
            params,
            offset: sent,
            len,
            chunk,
        };
        let client = self.client.clone();
        let url = self.config.url.clone();
        let body = async_std::task::spawn_blocking(move || post_chunk(&client, &url, request))
            .await?;
        Ok((len, body))
    }
}

fn post_chunk(
    client: &reqwest::blocking::Client,
    url: &str,
    request: ChunkRequest,
) -> Result<String, TransportError> {
    let mut source = std::fs::File::open(&request.path)?;
    if source.metadata()?.len() < request.offset + request.len {
        return Err(TransportError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "{} is shorter than its reported size",
                request.path.display()
            ),
        )));
    }
    source.seek(SeekFrom::Start(request.offset))?;

    let mut form = Form::new();
    for (name, value) in request.params.fields() {
        form = form.text(name, value);
    }
    if let Some((chunk, chunks)) = request.chunk {
        form = form
            .text("name", request.file_name.clone())
            .text("chunk", chunk.to_string())
            .text("chunks", chunks.to_string());
    }
    let part = Part::reader_with_length(source.take(request.len), request.len)
        .file_name(request.file_name);
    form = form.part("file", part);

    let response = client.post(url).multipart(form).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status {
            status: status.as_u16(),
        });
    }
    Ok(response.text()?)
}

fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}
