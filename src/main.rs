//! Comicraft - AI 漫画工作室
//!
//! 加载配置和项目存储，汇总已有项目；
//! 当前项目有内容时导出 PDF 与 CBZ。

use std::sync::Arc;

use comicraft::application::{
    DocumentEncoderPort, ExportFormat, ExportProject, ExportService, ImageGeneratorPort, Studio,
    StudioPorts,
};
use comicraft::config::{load_config, print_config, AppConfig, GenerationBackend};
use comicraft::infrastructure::adapters::{
    FakeImageClient, FileExportSink, HttpImageClient, HttpImageClientConfig,
};
use comicraft::infrastructure::events::EventPublisher;
use comicraft::infrastructure::export::{CbzEncoder, PdfEncoder};
use comicraft::infrastructure::persistence::SledProjectStore;
use comicraft::infrastructure::render::{SvgPageRasterizer, SvgRasterizerConfig};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},comicraft={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_generator(config: &AppConfig) -> anyhow::Result<Arc<dyn ImageGeneratorPort>> {
    let generation = &config.generation;
    match generation.backend {
        GenerationBackend::Http => {
            let client_config = HttpImageClientConfig {
                base_url: generation.base_url.clone(),
                api_key: generation.api_key.clone(),
                character_model: generation.character_model.clone(),
                panel_model: generation.panel_model.clone(),
                timeout_secs: generation.timeout_secs,
            };
            let client: Arc<dyn ImageGeneratorPort> = Arc::new(HttpImageClient::new(client_config)?);
            Ok(client)
        }
        GenerationBackend::Fake => {
            tracing::warn!("Using the offline fake image generator");
            let client: Arc<dyn ImageGeneratorPort> = Arc::new(FakeImageClient::with_defaults());
            Ok(client)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);
    tracing::info!("Comicraft - AI comic studio");
    print_config(&config);

    // 确保数据目录存在
    if let Some(parent) = config.storage.db_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let store = Arc::new(SledProjectStore::open(&config.storage.db_path)?);
    let generator = build_generator(&config)?;
    let sink = Arc::new(FileExportSink::new(&config.storage.export_dir).await?);

    let rasterizer = Arc::new(SvgPageRasterizer::new(SvgRasterizerConfig {
        page_width: config.export.page_width,
        pixel_ratio: config.export.pixel_ratio,
    }));
    let encoders: Vec<Arc<dyn DocumentEncoderPort>> = vec![
        Arc::new(PdfEncoder::new(
            config.export.pdf_page_width,
            config.export.pdf_page_height,
        )),
        Arc::new(CbzEncoder::new()),
    ];

    let events = EventPublisher::new().arc();
    let mut progress = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = progress.recv().await {
            tracing::debug!(event = ?event, "Studio event");
        }
    });

    let studio = Studio::load(StudioPorts {
        generator,
        store,
        events,
        exporter: ExportService::new(rasterizer, encoders),
        sink,
    })
    .await;

    let snapshot = studio.snapshot().await;
    if let Some(error) = &snapshot.error {
        tracing::warn!(error = %error, "Studio loaded with an error");
    }
    tracing::info!(
        projects = snapshot.projects.len(),
        theme = snapshot.theme.as_str(),
        "Studio loaded"
    );
    for project in &snapshot.projects {
        tracing::info!(
            project_id = %project.id(),
            name = %project.name(),
            pages = project.page_count(),
            has_character = project.character().is_some(),
            "Project"
        );
    }

    let Some(project) = snapshot.current_project().filter(|p| p.has_content()) else {
        tracing::info!("No current project with content, nothing to export");
        return Ok(());
    };

    for format in [ExportFormat::Pdf, ExportFormat::Cbz] {
        let cmd = ExportProject {
            project_id: project.id(),
            format,
        };
        match studio.export_project(cmd).await {
            Ok(path) => tracing::info!(
                format = %format,
                path = %path.display(),
                "Export complete"
            ),
            Err(e) => tracing::error!(format = %format, error = %e, "Export failed"),
        }
    }

    Ok(())
}
