use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::AppConfig;
use crate::policy::PolicyConfigHandle;
use crate::{ConfigError, ConfigResult};

/// 配置文件监听句柄，drop 时停止监听
pub struct ConfigWatchGuard {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for ConfigWatchGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// 监听配置文件变化并刷新策略配置
///
/// 监听的是文件所在目录，编辑器以替换方式保存文件时同样能触发重新加载。
/// 新配置校验失败时保留旧配置。必须在 tokio 运行时内调用。
pub fn watch_config_file(
    path: impl AsRef<Path>,
    handle: PolicyConfigHandle,
) -> ConfigResult<ConfigWatchGuard> {
    let path = path.as_ref().to_path_buf();
    let file_name: OsString = path
        .file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| ConfigError::File(format!("无效的配置文件路径: {}", path.display())))?;
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!("开始监听配置文件: {}", path.display());

    let task = tokio::spawn(async move {
        while let Some(res) = rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!("配置文件监听出错: {e}");
                    continue;
                }
            };

            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                continue;
            }
            if !event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()))
            {
                continue;
            }

            debug!("检测到配置文件变化: {:?}", event.kind);
            let path_str = path.to_string_lossy();
            match AppConfig::load(Some(&path_str)) {
                Ok(config) => {
                    if let Err(e) = handle.reload(&config) {
                        warn!("应用新配置失败，保留当前配置: {e}");
                    }
                }
                Err(e) => warn!("重新加载配置失败，保留当前配置: {e}"),
            }
        }
    });

    Ok(ConfigWatchGuard {
        _watcher: watcher,
        task,
    })
}
