//! Studio - 工作室服务
//!
//! 工作区的唯一写入者。所有变更在同一把异步锁内完成，并在持锁期间写穿存储，
//! 因此存储中的快照顺序与变更顺序一致。
//!
//! 远程生成与导出期间不持锁，其他变更可以穿插执行；续体按 id 重新定位目标。

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::application::commands::{
    AddPage, AddPanel, ChangePage, CreateCharacter, CreateProject, DeleteProject, ExportPage,
    ExportProject, RemoveCurrentPage, RemovePanel, SwitchProject,
};
use crate::application::error::ApplicationError;
use crate::application::export::ExportService;
use crate::application::ports::{
    ExportArtifact, ExportSinkPort, GenerationRequest, ImageGeneratorPort, ProjectStorePort,
    StudioEvent, StudioEventsPort,
};
use crate::application::prompts::{
    character_failure, character_sheet_prompt, panel_failure, panel_prompt,
    MSG_CHARACTER_REQUIRED, MSG_LOAD_FAILED, MSG_SAVE_FAILED,
};
use crate::domain::comic::{Character, PanelId, Project, ProjectId};
use crate::domain::{Theme, Workspace};

const MSG_EXPORT_TARGET_MISSING: &str = "Could not find comic page element to export.";
const MSG_PAGE_EXPORT_FAILED: &str = "Failed to export the comic page.";

/// Studio 依赖的端口集合
pub struct StudioPorts {
    pub generator: Arc<dyn ImageGeneratorPort>,
    pub store: Arc<dyn ProjectStorePort>,
    pub events: Arc<dyn StudioEventsPort>,
    pub exporter: ExportService,
    pub sink: Arc<dyn ExportSinkPort>,
}

struct StudioState {
    workspace: Workspace,
    theme: Theme,
    error: Option<String>,
    character_loading: Option<ProjectId>,
    exporting: bool,
}

/// 只读视图
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioSnapshot {
    pub projects: Vec<Project>,
    pub current_project_id: Option<ProjectId>,
    pub current_page_index: usize,
    pub theme: Theme,
    pub error: Option<String>,
    pub is_character_loading: bool,
    pub is_exporting: bool,
    pub export_progress: String,
}

impl StudioSnapshot {
    pub fn current_project(&self) -> Option<&Project> {
        self.current_project_id
            .and_then(|id| self.projects.iter().find(|p| p.id() == id))
    }
}

/// 分镜生成的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOutcome {
    /// 图像已写入分镜
    Completed,
    /// 生成失败，分镜已撤回
    Retracted,
    /// 生成成功但目标已不存在（非错误）
    Orphaned,
}

/// addPanel 的回执：乐观插入后立即返回
pub struct PanelTicket {
    project_id: ProjectId,
    panel_id: PanelId,
    handle: JoinHandle<PanelOutcome>,
}

impl PanelTicket {
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn panel_id(&self) -> PanelId {
        self.panel_id
    }

    /// 等待生成结束
    pub async fn settled(self) -> PanelOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(panel_id = %self.panel_id, error = %e, "Panel generation task aborted");
                PanelOutcome::Orphaned
            }
        }
    }
}

pub struct Studio {
    state: Mutex<StudioState>,
    export_progress: std::sync::Mutex<String>,
    generator: Arc<dyn ImageGeneratorPort>,
    store: Arc<dyn ProjectStorePort>,
    events: Arc<dyn StudioEventsPort>,
    exporter: ExportService,
    sink: Arc<dyn ExportSinkPort>,
}

impl Studio {
    /// 从存储加载工作区与主题
    ///
    /// 读取失败不致命：以空工作区启动并设置错误消息
    pub async fn load(ports: StudioPorts) -> Arc<Self> {
        let mut error = None;

        let workspace = match ports.store.load().await {
            Ok(stored) => {
                tracing::info!(
                    projects = stored.projects.len(),
                    current = ?stored.current_project_id,
                    "Workspace loaded"
                );
                let (workspace, report) =
                    Workspace::restore(stored.projects, stored.current_project_id);
                if !report.is_clean() {
                    tracing::warn!(
                        dropped_pending_panels = report.dropped_pending_panels,
                        refilled = ?report.refilled_projects,
                        skipped = ?report.skipped_projects,
                        "Repaired stored workspace"
                    );
                }
                workspace
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load workspace");
                error = Some(MSG_LOAD_FAILED.to_string());
                Workspace::new()
            }
        };

        let theme = match ports.store.load_theme().await {
            Ok(theme) => theme.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load theme, using default");
                Theme::default()
            }
        };

        Arc::new(Self {
            state: Mutex::new(StudioState {
                workspace,
                theme,
                error,
                character_loading: None,
                exporting: false,
            }),
            export_progress: std::sync::Mutex::new(String::new()),
            generator: ports.generator,
            store: ports.store,
            events: ports.events,
            exporter: ports.exporter,
            sink: ports.sink,
        })
    }

    // ------------------------------------------------------------------
    // 项目
    // ------------------------------------------------------------------

    pub async fn create_project(&self, cmd: CreateProject) -> Result<ProjectId, ApplicationError> {
        let mut state = self.state.lock().await;
        let id = state.workspace.create_project(&cmd.name)?;
        tracing::info!(project_id = %id, name = %cmd.name.trim(), "Project created");
        self.commit(&mut state).await;
        Ok(id)
    }

    /// 切换项目；id 不存在时静默忽略并返回 false
    pub async fn switch_project(&self, cmd: SwitchProject) -> bool {
        let mut state = self.state.lock().await;
        if !state.workspace.switch_project(cmd.project_id) {
            tracing::debug!(project_id = %cmd.project_id, "Ignoring switch to unknown project");
            return false;
        }
        self.commit(&mut state).await;
        true
    }

    pub async fn delete_project(&self, cmd: DeleteProject) -> bool {
        let mut state = self.state.lock().await;
        if !state.workspace.delete_project(cmd.project_id) {
            return false;
        }
        tracing::info!(project_id = %cmd.project_id, "Project deleted");
        self.commit(&mut state).await;
        true
    }

    // ------------------------------------------------------------------
    // 角色
    // ------------------------------------------------------------------

    /// 生成角色参考图
    ///
    /// 开始时立即清空角色并把页面重置为一个空白页，无论生成成败
    pub async fn create_character(&self, cmd: CreateCharacter) -> Result<(), ApplicationError> {
        let prompt = cmd.prompt.trim();
        let style = cmd.style.trim();
        if prompt.is_empty() || style.is_empty() {
            return Err(ApplicationError::validation(
                "Character prompt and style are required",
            ));
        }

        {
            let mut state = self.state.lock().await;
            if state.character_loading.is_some() {
                return Err(ApplicationError::invalid_state(
                    "A character is already being generated",
                ));
            }
            state.workspace.begin_character(cmd.project_id)?;
            state.character_loading = Some(cmd.project_id);
            state.error = None;
            self.commit(&mut state).await;
        }

        tracing::info!(project_id = %cmd.project_id, style = %style, "Generating character sheet");
        let request = GenerationRequest::text(character_sheet_prompt(prompt, style));
        let result = self.generator.generate_character(request).await;

        let mut state = self.state.lock().await;
        state.character_loading = None;
        match result {
            Ok(image) => {
                let character = Character::new(prompt, style, image);
                if state.workspace.attach_character(cmd.project_id, character) {
                    self.commit(&mut state).await;
                    self.events.publish(StudioEvent::CharacterReady {
                        project_id: cmd.project_id,
                    });
                } else {
                    tracing::debug!(project_id = %cmd.project_id, "Project vanished before character arrived");
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(project_id = %cmd.project_id, error = %e, "Character generation failed");
                let message = character_failure(e.reason());
                self.raise(&mut state, message.clone());
                self.events.publish(StudioEvent::CharacterFailed {
                    project_id: cmd.project_id,
                    error: message.clone(),
                });
                Err(ApplicationError::ExternalServiceError(message))
            }
        }
    }

    // ------------------------------------------------------------------
    // 分镜
    // ------------------------------------------------------------------

    /// 乐观插入分镜并在后台生成图像
    pub async fn add_panel(self: &Arc<Self>, cmd: AddPanel) -> Result<PanelTicket, ApplicationError> {
        let project_id = cmd.project_id;
        let (panel_id, request) = {
            let mut state = self.state.lock().await;
            let character = state
                .workspace
                .project(project_id)
                .ok_or(ApplicationError::ProjectNotFound(project_id))?
                .character()
                .cloned();
            let Some(character) = character else {
                self.raise(&mut state, MSG_CHARACTER_REQUIRED.to_string());
                return Err(ApplicationError::business_rule(MSG_CHARACTER_REQUIRED));
            };

            let panel_id = state.workspace.insert_pending_panel(
                project_id,
                cmd.page_index,
                &cmd.scene,
                cmd.text_items,
            )?;
            state.error = None;
            self.commit(&mut state).await;

            let request = GenerationRequest::text(panel_prompt(&character, cmd.scene.trim()))
                .with_reference(character.image().clone(), character.style());
            (panel_id, request)
        };

        tracing::info!(project_id = %project_id, panel_id = %panel_id, "Panel inserted, generating image");

        let studio = Arc::clone(self);
        let handle =
            tokio::spawn(async move { studio.settle_panel(project_id, panel_id, request).await });

        Ok(PanelTicket {
            project_id,
            panel_id,
            handle,
        })
    }

    async fn settle_panel(
        &self,
        project_id: ProjectId,
        panel_id: PanelId,
        request: GenerationRequest,
    ) -> PanelOutcome {
        let result = self.generator.generate_panel(request).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(image) => {
                if !state.workspace.complete_panel(project_id, panel_id, image) {
                    tracing::debug!(panel_id = %panel_id, "Panel removed before image arrived");
                    return PanelOutcome::Orphaned;
                }
                self.commit(&mut state).await;
                self.events.publish(StudioEvent::PanelCompleted {
                    project_id,
                    panel_id,
                });
                PanelOutcome::Completed
            }
            Err(e) => {
                tracing::warn!(panel_id = %panel_id, error = %e, "Panel generation failed");
                let message = panel_failure(e.reason());
                if state.workspace.retract_panel(project_id, panel_id) {
                    self.commit(&mut state).await;
                }
                self.raise(&mut state, message.clone());
                self.events.publish(StudioEvent::PanelRetracted {
                    project_id,
                    panel_id,
                    error: message,
                });
                PanelOutcome::Retracted
            }
        }
    }

    /// 删除分镜；不存在时不做任何事
    pub async fn remove_panel(&self, cmd: RemovePanel) -> bool {
        let mut state = self.state.lock().await;
        if !state
            .workspace
            .remove_panel(cmd.project_id, cmd.page_index, cmd.panel_id)
        {
            return false;
        }
        self.commit(&mut state).await;
        true
    }

    // ------------------------------------------------------------------
    // 页面
    // ------------------------------------------------------------------

    pub async fn add_page(&self, cmd: AddPage) -> Result<usize, ApplicationError> {
        let mut state = self.state.lock().await;
        let index = state.workspace.add_page(cmd.project_id)?;
        self.commit(&mut state).await;
        Ok(index)
    }

    /// 删除当前页；只剩一页时拒绝，状态不变
    pub async fn remove_current_page(&self, cmd: RemoveCurrentPage) -> Result<(), ApplicationError> {
        let mut state = self.state.lock().await;
        state.workspace.remove_current_page(cmd.project_id)?;
        self.commit(&mut state).await;
        Ok(())
    }

    /// 切换当前页；越界时不做任何事
    pub async fn change_page(&self, cmd: ChangePage) -> bool {
        let mut state = self.state.lock().await;
        let changed = state.workspace.change_page(cmd.project_id, cmd.index);
        if changed {
            self.events.publish(StudioEvent::WorkspaceChanged);
        }
        changed
    }

    // ------------------------------------------------------------------
    // 主题与消息
    // ------------------------------------------------------------------

    pub async fn toggle_theme(&self) -> Theme {
        let mut state = self.state.lock().await;
        state.theme = state.theme.toggled();
        if let Err(e) = self.store.save_theme(state.theme).await {
            tracing::warn!(error = %e, "Failed to persist theme");
            self.raise(&mut state, MSG_SAVE_FAILED.to_string());
        }
        self.events.publish(StudioEvent::WorkspaceChanged);
        state.theme
    }

    pub async fn clear_error(&self) {
        self.state.lock().await.error = None;
    }

    pub async fn error_message(&self) -> Option<String> {
        self.state.lock().await.error.clone()
    }

    pub async fn snapshot(&self) -> StudioSnapshot {
        let state = self.state.lock().await;
        StudioSnapshot {
            projects: state.workspace.projects().to_vec(),
            current_project_id: state.workspace.current_project_id(),
            current_page_index: state.workspace.current_page_index(),
            theme: state.theme,
            error: state.error.clone(),
            is_character_loading: state.character_loading.is_some(),
            is_exporting: state.exporting,
            export_progress: self.progress_text(),
        }
    }

    // ------------------------------------------------------------------
    // 导出
    // ------------------------------------------------------------------

    /// 导出当前页为 PNG
    pub async fn export_page(&self, cmd: ExportPage) -> Result<PathBuf, ApplicationError> {
        let (project, page_index, theme) = {
            let mut state = self.state.lock().await;
            let page_index = state.workspace.current_page_index();
            let project = state
                .workspace
                .current_project()
                .filter(|p| p.id() == cmd.project_id && page_index < p.page_count())
                .cloned();
            let Some(project) = project else {
                self.raise(&mut state, MSG_EXPORT_TARGET_MISSING.to_string());
                return Err(ApplicationError::invalid_state(MSG_EXPORT_TARGET_MISSING));
            };
            (project, page_index, state.theme)
        };

        let result = match self.exporter.export_page(&project, page_index, theme).await {
            Ok(artifact) => self.deliver(artifact).await,
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(path) => Ok(path),
            Err(reason) => {
                tracing::error!(project_id = %project.id(), error = %reason, "Page export failed");
                let mut state = self.state.lock().await;
                self.raise(&mut state, MSG_PAGE_EXPORT_FAILED.to_string());
                Err(ApplicationError::ExportError(reason))
            }
        }
    }

    /// 导出整个项目（PDF 或 CBZ）
    ///
    /// 导出标志与进度文本在所有路径上都会被清除
    pub async fn export_project(&self, cmd: ExportProject) -> Result<PathBuf, ApplicationError> {
        let (project, theme) = {
            let mut state = self.state.lock().await;
            if state.exporting {
                return Err(ApplicationError::invalid_state("An export is already running"));
            }
            let project = state
                .workspace
                .project(cmd.project_id)
                .cloned()
                .ok_or(ApplicationError::ProjectNotFound(cmd.project_id))?;
            state.exporting = true;
            state.error = None;
            (project, state.theme)
        };

        let progress = |message: &str| self.report_progress(message);
        let result = match self
            .exporter
            .export_project(&project, cmd.format, theme, &progress)
            .await
        {
            Ok(artifact) => self.deliver(artifact).await,
            Err(e) => Err(e.to_string()),
        };
        self.report_progress("");

        let mut state = self.state.lock().await;
        state.exporting = false;
        match result {
            Ok(path) => Ok(path),
            Err(reason) => {
                tracing::error!(project_id = %project.id(), format = %cmd.format, error = %reason, "Project export failed");
                self.raise(&mut state, reason.clone());
                Err(ApplicationError::ExportError(reason))
            }
        }
    }

    async fn deliver(&self, artifact: ExportArtifact) -> Result<PathBuf, String> {
        let path = self.sink.deliver(&artifact).await.map_err(|e| e.to_string())?;
        tracing::info!(file = %artifact.file_name, path = %path.display(), "Export delivered");
        self.events.publish(StudioEvent::ExportFinished {
            file_name: artifact.file_name,
        });
        Ok(path)
    }

    fn report_progress(&self, message: &str) {
        if let Ok(mut current) = self.export_progress.lock() {
            if current.as_str() == message {
                return;
            }
            *current = message.to_string();
        }
        self.events.publish(StudioEvent::ExportProgress {
            message: message.to_string(),
        });
    }

    fn progress_text(&self) -> String {
        self.export_progress
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // 内部
    // ------------------------------------------------------------------

    /// 写穿存储并通知订阅者
    ///
    /// 写入失败不回滚内存状态
    async fn commit(&self, state: &mut StudioState) {
        if let Err(e) = self
            .store
            .save(state.workspace.projects(), state.workspace.current_project_id())
            .await
        {
            tracing::warn!(error = %e, "Failed to persist workspace");
            self.raise(state, MSG_SAVE_FAILED.to_string());
        }
        self.events.publish(StudioEvent::WorkspaceChanged);
    }

    /// 最新消息覆盖旧消息
    fn raise(&self, state: &mut StudioState, message: String) {
        state.error = Some(message.clone());
        self.events.publish(StudioEvent::ErrorRaised { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        DocumentEncoderPort, ExportFormat, GenerationError, PageRasterizerPort, RasterImage,
        RenderError,
    };
    use crate::domain::comic::{ImageData, Page, TextKind};
    use crate::domain::TextItemDraft;
    use crate::infrastructure::export::CbzEncoder;
    use crate::infrastructure::memory::{InMemoryExportSink, InMemoryProjectStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Read;
    use tokio::sync::Semaphore;

    /// 由信号量放行的生成器
    struct GatedGenerator {
        gate: Semaphore,
        fail: std::sync::atomic::AtomicBool,
    }

    impl GatedGenerator {
        fn open() -> Arc<Self> {
            let generator = Self::closed();
            generator.gate.add_permits(1_000);
            generator
        }

        fn closed() -> Arc<Self> {
            Arc::new(Self {
                gate: Semaphore::new(0),
                fail: Default::default(),
            })
        }

        fn failing(&self, fail: bool) {
            self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
        }

        fn release(&self, n: usize) {
            self.gate.add_permits(n);
        }

        async fn respond(&self) -> Result<ImageData, GenerationError> {
            let permit = self.gate.acquire().await.map_err(|e| GenerationError::Network(e.to_string()))?;
            permit.forget();
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                Err(GenerationError::Service("quota exceeded".to_string()))
            } else {
                Ok(ImageData::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png"))
            }
        }
    }

    #[async_trait]
    impl ImageGeneratorPort for GatedGenerator {
        async fn generate_character(&self, _request: GenerationRequest) -> Result<ImageData, GenerationError> {
            self.respond().await
        }

        async fn generate_panel(&self, request: GenerationRequest) -> Result<ImageData, GenerationError> {
            assert!(request.reference_image.is_some());
            self.respond().await
        }
    }

    struct FlatRasterizer;

    #[async_trait]
    impl PageRasterizerPort for FlatRasterizer {
        async fn rasterize(&self, page: &Page, _theme: Theme) -> Result<RasterImage, RenderError> {
            Ok(RasterImage {
                width: 10,
                height: 10,
                png: vec![page.panel_count() as u8; 4],
            })
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        events: std::sync::Mutex<Vec<StudioEvent>>,
    }

    impl StudioEventsPort for RecordingEvents {
        fn publish(&self, event: StudioEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    struct Fixture {
        studio: Arc<Studio>,
        store: Arc<InMemoryProjectStore>,
        sink: Arc<InMemoryExportSink>,
        events: Arc<RecordingEvents>,
    }

    async fn fixture(generator: Arc<GatedGenerator>, store: Arc<InMemoryProjectStore>) -> Fixture {
        let sink = Arc::new(InMemoryExportSink::new());
        let events = Arc::new(RecordingEvents::default());
        let encoders: Vec<Arc<dyn DocumentEncoderPort>> = vec![Arc::new(CbzEncoder::new())];
        let studio = Studio::load(StudioPorts {
            generator: generator.clone(),
            store: store.clone(),
            events: events.clone(),
            exporter: ExportService::new(Arc::new(FlatRasterizer), encoders),
            sink: sink.clone(),
        })
        .await;
        Fixture {
            studio,
            store,
            sink,
            events,
        }
    }

    async fn project_with_character(f: &Fixture, name: &str) -> ProjectId {
        let id = f
            .studio
            .create_project(CreateProject { name: name.to_string() })
            .await
            .unwrap();
        f.studio
            .create_character(CreateCharacter {
                project_id: id,
                prompt: "A detective".to_string(),
                style: "noir".to_string(),
            })
            .await
            .unwrap();
        id
    }

    fn add_panel_cmd(project_id: ProjectId, page_index: usize, scene: &str) -> AddPanel {
        AddPanel {
            project_id,
            page_index,
            scene: scene.to_string(),
            text_items: vec![TextItemDraft::new(TextKind::Dialogue, "Hello")],
        }
    }

    fn panel_count(snapshot: &StudioSnapshot, page: usize) -> usize {
        snapshot.current_project().unwrap().pages()[page].panel_count()
    }

    fn cbz_entries(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            names.push(entry.name().to_string());
        }
        names
    }

    #[tokio::test]
    async fn test_scenario_demo_project_to_archive() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = f
            .studio
            .create_project(CreateProject { name: "Demo".to_string() })
            .await
            .unwrap();

        let snapshot = f.studio.snapshot().await;
        assert_eq!(snapshot.current_project().unwrap().name().as_str(), "Demo");
        assert_eq!(snapshot.current_project().unwrap().page_count(), 1);

        f.studio
            .create_character(CreateCharacter {
                project_id: id,
                prompt: "A detective".to_string(),
                style: "noir".to_string(),
            })
            .await
            .unwrap();
        assert!(f.studio.snapshot().await.current_project().unwrap().character().is_some());

        let ticket = f.studio.add_panel(add_panel_cmd(id, 0, "X")).await.unwrap();
        assert_eq!(ticket.settled().await, PanelOutcome::Completed);
        let snapshot = f.studio.snapshot().await;
        let panel = &snapshot.current_project().unwrap().pages()[0].panels()[0];
        assert!(!panel.is_loading());
        assert!(!panel.image().unwrap().is_empty());

        assert_eq!(f.studio.add_page(AddPage { project_id: id }).await.unwrap(), 1);
        let snapshot = f.studio.snapshot().await;
        assert_eq!(snapshot.current_project().unwrap().page_count(), 2);
        assert_eq!(snapshot.current_page_index, 1);

        f.studio
            .export_project(ExportProject {
                project_id: id,
                format: ExportFormat::Cbz,
            })
            .await
            .unwrap();
        let artifacts = f.sink.artifacts();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name, "Demo.cbz");
        assert_eq!(cbz_entries(&artifacts[0].bytes), vec!["page_000.png"]);

        let snapshot = f.studio.snapshot().await;
        assert!(!snapshot.is_exporting);
        assert_eq!(snapshot.export_progress, "");
    }

    #[tokio::test]
    async fn test_scenario_failed_panel_is_retracted() {
        let generator = GatedGenerator::open();
        let f = fixture(generator.clone(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "Demo").await;

        generator.failing(true);
        let before = panel_count(&f.studio.snapshot().await, 0);
        let ticket = f.studio.add_panel(add_panel_cmd(id, 0, "X")).await.unwrap();
        assert_eq!(ticket.settled().await, PanelOutcome::Retracted);

        let snapshot = f.studio.snapshot().await;
        assert_eq!(panel_count(&snapshot, 0), before);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Failed to generate panel image. Details: quota exceeded")
        );
    }

    #[tokio::test]
    async fn test_scenario_regenerating_character_resets_pages() {
        for fail in [false, true] {
            let generator = GatedGenerator::open();
            let f = fixture(generator.clone(), Arc::new(InMemoryProjectStore::new())).await;
            let id = project_with_character(&f, "Demo").await;

            f.studio.add_panel(add_panel_cmd(id, 0, "a")).await.unwrap().settled().await;
            f.studio.add_page(AddPage { project_id: id }).await.unwrap();
            f.studio.add_panel(add_panel_cmd(id, 1, "b")).await.unwrap().settled().await;
            assert_eq!(f.studio.snapshot().await.current_project().unwrap().page_count(), 2);

            generator.failing(fail);
            let result = f
                .studio
                .create_character(CreateCharacter {
                    project_id: id,
                    prompt: "Another".to_string(),
                    style: "pop art".to_string(),
                })
                .await;
            assert_eq!(result.is_err(), fail);

            let snapshot = f.studio.snapshot().await;
            let project = snapshot.current_project().unwrap();
            assert_eq!(project.page_count(), 1);
            assert!(project.pages()[0].is_empty());
            assert_eq!(project.character().is_some(), !fail);
            assert_eq!(snapshot.current_page_index, 0);
        }
    }

    #[tokio::test]
    async fn test_pages_reset_before_character_generation_finishes() {
        let generator = GatedGenerator::open();
        let f = fixture(generator.clone(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "Demo").await;
        f.studio.add_page(AddPage { project_id: id }).await.unwrap();

        let closed = GatedGenerator::closed();
        let f2 = fixture(closed.clone(), f.store.clone()).await;

        let studio = f2.studio.clone();
        let pending = tokio::spawn(async move {
            studio
                .create_character(CreateCharacter {
                    project_id: id,
                    prompt: "Another".to_string(),
                    style: "ink".to_string(),
                })
                .await
        });

        // 等待重置落地
        loop {
            let snapshot = f2.studio.snapshot().await;
            if snapshot.is_character_loading {
                let project = snapshot.current_project().unwrap();
                assert_eq!(project.page_count(), 1);
                assert!(project.character().is_none());
                break;
            }
            tokio::task::yield_now().await;
        }

        let second = f2
            .studio
            .create_character(CreateCharacter {
                project_id: id,
                prompt: "Third".to_string(),
                style: "ink".to_string(),
            })
            .await;
        assert!(matches!(second, Err(ApplicationError::InvalidState(_))));

        closed.release(1);
        pending.await.unwrap().unwrap();
        assert!(!f2.studio.snapshot().await.is_character_loading);
    }

    #[tokio::test]
    async fn test_add_panel_without_character_is_rejected() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = f
            .studio
            .create_project(CreateProject { name: "Demo".to_string() })
            .await
            .unwrap();

        let result = f.studio.add_panel(add_panel_cmd(id, 0, "X")).await;
        assert!(matches!(result, Err(ApplicationError::BusinessRuleViolation(_))));

        let snapshot = f.studio.snapshot().await;
        assert_eq!(panel_count(&snapshot, 0), 0);
        assert_eq!(snapshot.error.as_deref(), Some(MSG_CHARACTER_REQUIRED));
    }

    #[tokio::test]
    async fn test_interleaved_removal_is_preserved_by_id() {
        let generator = GatedGenerator::open();
        let f = fixture(generator.clone(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "Demo").await;
        f.studio.add_panel(add_panel_cmd(id, 0, "first")).await.unwrap().settled().await;
        let first = f.studio.snapshot().await.current_project().unwrap().pages()[0].panels()[0].id();

        // 关闭闸门：第二个分镜停留在生成中
        let gated = GatedGenerator::closed();
        let f2 = fixture(gated.clone(), f.store.clone()).await;
        let ticket = f2.studio.add_panel(add_panel_cmd(id, 0, "second")).await.unwrap();

        f2.studio.add_page(AddPage { project_id: id }).await.unwrap();
        assert!(
            f2.studio
                .remove_panel(RemovePanel {
                    project_id: id,
                    page_index: 0,
                    panel_id: first,
                })
                .await
        );

        gated.release(1);
        assert_eq!(ticket.settled().await, PanelOutcome::Completed);

        let snapshot = f2.studio.snapshot().await;
        let page = &snapshot.current_project().unwrap().pages()[0];
        assert_eq!(page.panel_count(), 1);
        assert_eq!(page.panels()[0].scene(), "second");
        assert!(!page.panels()[0].is_loading());
        assert_eq!(snapshot.current_page_index, 1);
    }

    #[tokio::test]
    async fn test_panel_outcome_orphaned_when_project_deleted() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "Demo").await;

        let closed = GatedGenerator::closed();
        let f2 = fixture(closed.clone(), f.store.clone()).await;
        let ticket = f2.studio.add_panel(add_panel_cmd(id, 0, "X")).await.unwrap();
        assert!(f2.studio.delete_project(DeleteProject { project_id: id }).await);

        closed.release(1);
        assert_eq!(ticket.settled().await, PanelOutcome::Orphaned);
        let snapshot = f2.studio.snapshot().await;
        assert!(snapshot.projects.is_empty());
        assert!(snapshot.current_project_id.is_none());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_remove_last_page_rejected_and_index_clamped() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = f
            .studio
            .create_project(CreateProject { name: "Demo".to_string() })
            .await
            .unwrap();

        let result = f.studio.remove_current_page(RemoveCurrentPage { project_id: id }).await;
        assert!(matches!(result, Err(ApplicationError::BusinessRuleViolation(_))));
        assert_eq!(f.studio.snapshot().await.current_project().unwrap().page_count(), 1);

        f.studio.add_page(AddPage { project_id: id }).await.unwrap();
        f.studio.add_page(AddPage { project_id: id }).await.unwrap();
        assert!(!f.studio.change_page(ChangePage { project_id: id, index: -1 }).await);
        assert!(!f.studio.change_page(ChangePage { project_id: id, index: 3 }).await);
        assert_eq!(f.studio.snapshot().await.current_page_index, 2);

        f.studio.remove_current_page(RemoveCurrentPage { project_id: id }).await.unwrap();
        let snapshot = f.studio.snapshot().await;
        assert_eq!(snapshot.current_project().unwrap().page_count(), 2);
        assert_eq!(snapshot.current_page_index, 1);
    }

    #[tokio::test]
    async fn test_state_persists_and_reloads() {
        let store = Arc::new(InMemoryProjectStore::new());
        let f = fixture(GatedGenerator::open(), store.clone()).await;
        let id = project_with_character(&f, "Saved Comic").await;
        f.studio.add_panel(add_panel_cmd(id, 0, "X")).await.unwrap().settled().await;
        f.studio.toggle_theme().await;
        let before = f.studio.snapshot().await;

        let reloaded = fixture(GatedGenerator::open(), store).await;
        let after = reloaded.studio.snapshot().await;
        assert_eq!(after.projects, before.projects);
        assert_eq!(after.current_project_id, Some(id));
        assert_eq!(after.theme, Theme::Dark);
        assert!(after.error.is_none());
    }

    #[tokio::test]
    async fn test_reload_drops_unfinished_panels_and_refills_pages() {
        let store = Arc::new(InMemoryProjectStore::new());
        let generator = GatedGenerator::closed();
        generator.release(1);
        let f = fixture(generator, store.clone()).await;
        let id = project_with_character(&f, "Interrupted").await;
        let ticket = f.studio.add_panel(add_panel_cmd(id, 0, "Never drawn")).await.unwrap();
        assert_eq!(panel_count(&f.studio.snapshot().await, 0), 1);

        // 模拟进程在生成结束前退出：存储中留下 loading 分镜，再追加一个无页面的项目
        let mut projects = store.load().await.unwrap().projects;
        assert!(projects[0].pages()[0].panels()[0].is_loading());
        projects.push(
            serde_json::from_value(serde_json::json!({
                "id": 42, "name": "Empty", "character": null, "pages": []
            }))
            .unwrap(),
        );
        store.save(&projects, Some(id)).await.unwrap();

        let reloaded = fixture(GatedGenerator::open(), store).await;
        let snapshot = reloaded.studio.snapshot().await;
        assert_eq!(snapshot.projects.len(), 2);
        for project in &snapshot.projects {
            assert!(project.page_count() >= 1);
            assert!(project
                .pages()
                .iter()
                .flat_map(|page| page.panels())
                .all(|panel| !panel.is_loading()));
        }
        assert_eq!(panel_count(&snapshot, 0), 0);
        assert_eq!(snapshot.current_project_id, Some(id));

        ticket.handle.abort();
    }

    #[tokio::test]
    async fn test_save_failure_sets_warning_but_keeps_state() {
        let store = Arc::new(InMemoryProjectStore::new());
        let f = fixture(GatedGenerator::open(), store.clone()).await;
        store.reject_writes(true);

        let id = f
            .studio
            .create_project(CreateProject { name: "Unsaved".to_string() })
            .await
            .unwrap();
        let snapshot = f.studio.snapshot().await;
        assert_eq!(snapshot.current_project_id, Some(id));
        assert_eq!(snapshot.error.as_deref(), Some(MSG_SAVE_FAILED));

        f.studio.clear_error().await;
        assert!(f.studio.error_message().await.is_none());
    }

    #[tokio::test]
    async fn test_load_failure_starts_empty_with_message() {
        let store = Arc::new(InMemoryProjectStore::new());
        store.reject_reads(true);
        let f = fixture(GatedGenerator::open(), store).await;
        let snapshot = f.studio.snapshot().await;
        assert!(snapshot.projects.is_empty());
        assert_eq!(snapshot.error.as_deref(), Some(MSG_LOAD_FAILED));
    }

    #[tokio::test]
    async fn test_export_failure_clears_flag_and_reports() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "Demo").await;

        // 未注册 PDF 编码器
        let result = f
            .studio
            .export_project(ExportProject {
                project_id: id,
                format: ExportFormat::Pdf,
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::ExportError(_))));

        let snapshot = f.studio.snapshot().await;
        assert!(!snapshot.is_exporting);
        assert_eq!(snapshot.export_progress, "");
        assert!(snapshot.error.is_some());
        assert!(f.sink.artifacts().is_empty());
    }

    #[tokio::test]
    async fn test_export_page_uses_current_index() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "My Comic").await;
        f.studio.add_page(AddPage { project_id: id }).await.unwrap();

        f.studio.export_page(ExportPage { project_id: id }).await.unwrap();
        let artifacts = f.sink.artifacts();
        assert_eq!(artifacts[0].file_name, "My_Comic_page_2.png");

        let finished: Vec<_> = f
            .events
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, StudioEvent::ExportFinished { .. }))
            .cloned()
            .collect();
        assert_eq!(finished.len(), 1);
    }

    #[tokio::test]
    async fn test_export_progress_events_in_order() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = project_with_character(&f, "Demo").await;
        f.studio.add_panel(add_panel_cmd(id, 0, "X")).await.unwrap().settled().await;

        f.studio
            .export_project(ExportProject {
                project_id: id,
                format: ExportFormat::Cbz,
            })
            .await
            .unwrap();

        let messages: Vec<String> = f
            .events
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                StudioEvent::ExportProgress { message } => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            messages,
            vec![
                "Starting CBZ export...",
                "Processing page 1 of 1...",
                "Saving CBZ...",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_unique_ids_across_rapid_creation() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let mut seen = HashMap::new();
        for i in 0..20 {
            let id = f
                .studio
                .create_project(CreateProject { name: format!("P{i}") })
                .await
                .unwrap();
            assert!(seen.insert(id, i).is_none());
        }
        let (&doomed, _) = seen.iter().next().unwrap();
        f.studio.delete_project(DeleteProject { project_id: doomed }).await;
        let snapshot = f.studio.snapshot().await;
        for id in seen.keys().filter(|id| **id != doomed) {
            assert!(snapshot.projects.iter().any(|p| p.id() == *id));
        }
    }

    #[tokio::test]
    async fn test_switch_to_unknown_project_is_ignored() {
        let f = fixture(GatedGenerator::open(), Arc::new(InMemoryProjectStore::new())).await;
        let id = f
            .studio
            .create_project(CreateProject { name: "Demo".to_string() })
            .await
            .unwrap();
        let unknown = ProjectId::from_raw(id.as_i64() + 1_000);
        assert!(!f.studio.switch_project(SwitchProject { project_id: unknown }).await);
        assert_eq!(f.studio.snapshot().await.current_project_id, Some(id));
    }
}
