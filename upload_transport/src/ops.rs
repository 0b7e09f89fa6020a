use crate::{MultipartParams, SelectedFile, TransportError};

/// Control surface of a chunked upload transport.
///
/// Implementations report progress, completion and failures as
/// `core_types::events::TransportEvent`s rather than return values, so every method
/// here only issues a command and returns immediately.
pub trait UploadTransportOps: Send + Sync {
    /// Queue a file for transfer. Nothing is sent until `start` is called.
    fn add_file(&self, file: SelectedFile) -> Result<(), TransportError>;

    /// Drop a queued file. Unknown ids are ignored.
    fn remove_file(&self, file_id: &str);

    /// Begin or resume sending queued files. With an empty queue the transport just
    /// becomes ready for the next file.
    fn start(&self) -> Result<(), TransportError>;

    /// Halt after the chunk in flight. Sent bytes are kept so `start` resumes, and a
    /// chunk that completes its file still reports the file as uploaded.
    fn stop(&self);

    fn params(&self) -> MultipartParams;

    fn set_params(&self, params: MultipartParams);

    /// Reset every form field to an empty string.
    fn clear_params(&self) {
        self.set_params(MultipartParams::default());
    }
}
