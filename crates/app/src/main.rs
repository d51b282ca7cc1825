use std::sync::Arc;

use engine::{ArchiveService, ReceiptExtractor, ReceiptPipeline};
use server::{AuthConfig, ServerConfig};
use settings::{Settings, StorageKind};

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "receipts={level},server={level},engine={level},gemini={level},ynab={level},storage={level}",
            level = settings.app.level
        ))
        .init();

    let budget = ynab::YnabClient::builder()
        .api_key(&settings.ynab.api_key)
        .budget_id(&settings.ynab.budget_id)
        .category_groups(settings.ynab.category_groups.clone())
        .base_url(settings.ynab.base_url.as_deref())
        .build()?;

    let pipeline = ReceiptPipeline::builder()
        .budget(Arc::new(budget))
        .extractor(extractor(&settings.gemini)?)
        .archive(archive(settings.storage.as_ref())?)
        .include_payees(settings.ynab.include_payees_in_prompt)
        .build()?;

    let config = ServerConfig {
        auth: AuthConfig {
            api_key: settings.app.api_key.clone(),
            api_secret: settings.app.api_secret.clone(),
            disable_auth: settings.app.disable_auth,
            trusted_ips: settings.app.trusted_ips.clone(),
        },
        max_file_size: settings.app.max_file_size,
    };

    let addr = format!("{}:{}", settings.app.bind, settings.app.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tokio::select! {
        res = server::run_with_listener(pipeline, config, listener) => {
            if let Err(err) = res {
                tracing::error!("server failed: {err}");
                return Err(err.into());
            }
        }
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
    }

    Ok(())
}

fn extractor(section: &settings::Gemini) -> Result<Arc<dyn ReceiptExtractor>, BoxError> {
    if section.use_mock {
        let fixture =
            gemini::FixtureExtractor::new(&section.mocks_dir, section.mock_fixture.as_deref());
        tracing::warn!(path = %fixture.path().display(), "Using mocked receipt extraction");
        return Ok(Arc::new(fixture));
    }

    let client = gemini::GeminiClient::builder()
        .api_key(&section.api_key)
        .model(&section.model)
        .base_url(section.base_url.as_deref())
        .build()?;
    Ok(Arc::new(client))
}

fn archive(
    section: Option<&settings::Storage>,
) -> Result<Option<Arc<dyn ArchiveService>>, BoxError> {
    let Some(section) = section else {
        tracing::info!("No storage configured, receipts will not be archived");
        return Ok(None);
    };

    let archive: Arc<dyn ArchiveService> = match section.kind {
        StorageKind::Local => Arc::new(storage::LocalArchive::new(
            section
                .directory
                .as_deref()
                .unwrap_or(storage::DEFAULT_DIRECTORY),
            section.date_subdirectories,
        )),
        StorageKind::S3 => Arc::new(
            storage::S3Archive::builder()
                .bucket(section.bucket.as_deref().unwrap_or_default())
                .credentials(
                    section.access_key_id.as_deref().unwrap_or_default(),
                    section.secret_access_key.as_deref().unwrap_or_default(),
                )
                .region(section.region.as_deref())
                .endpoint(section.endpoint.as_deref())
                .path_prefix(section.path_prefix.as_deref())
                .date_subdirectories(section.date_subdirectories)
                .build()?,
        ),
    };
    Ok(Some(archive))
}
