use std::fmt::Debug;
use std::path::Path;

use google_drive3::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_drive3::hyper_util::client::legacy::connect::HttpConnector;
use google_drive3::hyper_util::client::legacy::Client;
use google_drive3::hyper_util::rt::TokioExecutor;
use google_drive3::{api::Scope, yup_oauth2, DriveHub};
use tokio::runtime::Handle;

/// Connector used by the service-account Drive client.
pub type DriveConnector = HttpsConnector<HttpConnector>;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("drive download failed: {0}")]
    Backend(String),
    #[error("drive runtime unavailable: {0}")]
    Runtime(String),
    #[error("drive returned an empty payload for file {0}")]
    Empty(String),
    #[error("drive credentials unusable: {0}")]
    Credentials(String),
}

/// Downloads an artifact by its stable remote identifier.
pub trait ArtifactFetcher: Debug + Send + Sync {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>, FetchError>;
}

/// Thin wrapper around the generated google-drive3 client so the synchronous artifact
/// loader can download files without exposing async details.
///
/// `fetch` blocks on the captured runtime handle, so it must run on a blocking thread
/// rather than inside an async task.
pub struct GoogleDriveFetcher<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
    runtime: Handle,
}

impl<C> GoogleDriveFetcher<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>, runtime: Handle) -> Self {
        Self { hub, runtime }
    }

    pub fn with_current_runtime(hub: DriveHub<C>) -> Result<Self, FetchError> {
        let runtime = Handle::try_current().map_err(|err| FetchError::Runtime(err.to_string()))?;
        Ok(Self::new(hub, runtime))
    }

    fn map_error<E: std::fmt::Display>(err: E) -> FetchError {
        FetchError::Backend(err.to_string())
    }
}

impl GoogleDriveFetcher<DriveConnector> {
    /// Authenticates with a service-account key file and builds the Drive client.
    pub async fn from_service_account(
        key_path: &Path,
        runtime: Handle,
    ) -> Result<Self, FetchError> {
        let key = yup_oauth2::read_service_account_key(key_path)
            .await
            .map_err(|err| FetchError::Credentials(format!("{}: {err}", key_path.display())))?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|err| FetchError::Credentials(err.to_string()))?;

        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| FetchError::Runtime(err.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self::new(DriveHub::new(client, auth), runtime))
    }
}

impl<C> Debug for GoogleDriveFetcher<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveFetcher").finish_non_exhaustive()
    }
}

impl<C> ArtifactFetcher for GoogleDriveFetcher<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>, FetchError> {
        let (response, _) = self
            .runtime
            .block_on(async {
                self.hub
                    .files()
                    .get(file_id)
                    .param("alt", "media")
                    .supports_all_drives(true)
                    .add_scope(Scope::Readonly)
                    .doit()
                    .await
            })
            .map_err(GoogleDriveFetcher::<C>::map_error)?;

        let bytes = self
            .runtime
            .block_on(google_drive3::common::to_bytes(response.into_body()))
            .ok_or_else(|| FetchError::Backend(format!("could not read body of file {file_id}")))?;

        if bytes.is_empty() {
            return Err(FetchError::Empty(file_id.to_string()));
        }
        Ok(bytes.to_vec())
    }
}
