/*
 * @Author       : 老董
 * @Date         : 2026-02-15
 * @Description  : Markdown 浏览服务
 *
 * 所有接口都以 HTTP 200 返回`{success, ...}`或`{success: false, error}`；
 * 其余路径按静态文件从公开目录提供。
 */

use crate::config::MdViewerConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::debug;
use warp::reply::{Json, Reply};
use warp::{Filter, Rejection};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseItem {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub is_md: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseListing {
    pub items: Vec<BrowseItem>,
    pub dir: String,
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkdownFile {
    pub name: String,
    pub path: String,
    /// 修改时间，自 UNIX 纪元起的秒数
    pub mtime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileListing {
    pub files: Vec<MarkdownFile>,
    pub dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub content: String,
    pub filename: String,
}

fn is_markdown(name: &str) -> bool {
    name.ends_with(".md")
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// 列出子目录与`.md`文件：目录在前，再按名称（不区分大小写）排序。
/// 无法读取元数据的条目被跳过
pub fn browse(dir: &Path) -> io::Result<BrowseListing> {
    let mut items = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = dir.join(&name);
        let Ok(meta) = std::fs::metadata(&path) else {
            continue;
        };
        let item = BrowseItem {
            is_directory: meta.is_dir(),
            is_md: is_markdown(&name),
            path: display(&path),
            name,
        };
        if item.is_directory || item.is_md {
            items.push(item);
        }
    }
    items.sort_by(|a, b| {
        b.is_directory
            .cmp(&a.is_directory)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    Ok(BrowseListing {
        items,
        dir: display(dir),
        parent: display(dir.parent().unwrap_or(dir)),
    })
}

/// 以 UTF-8 读取文档
pub fn read_document(path: &Path) -> io::Result<Document> {
    let content = std::fs::read_to_string(path)?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Document { content, filename })
}

/// 列出`.md`文件，最近修改的在前
pub fn list_markdown(dir: &Path) -> io::Result<FileListing> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_markdown(&name) {
            continue;
        }
        let path = dir.join(&name);
        let modified = std::fs::metadata(&path)?.modified()?;
        let mtime = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.);
        files.push(MarkdownFile {
            name,
            path: display(&path),
            mtime,
        });
    }
    files.sort_by(|a, b| b.mtime.total_cmp(&a.mtime));
    Ok(FileListing {
        files,
        dir: display(dir),
    })
}

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: String,
}

fn envelope<T: Serialize>(result: Result<T, String>) -> Json {
    match result {
        Ok(body) => warp::reply::json(&Success {
            success: true,
            body,
        }),
        Err(error) => warp::reply::json(&Failure {
            success: false,
            error,
        }),
    }
}

/// 在阻塞线程池里执行文件系统操作
async fn on_disk<T, F>(job: F) -> Result<T, String>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[derive(Debug)]
struct Roots {
    default_root: PathBuf,
    browse_root: PathBuf,
}

type Query = HashMap<String, String>;

fn with_roots(roots: Arc<Roots>) -> impl Filter<Extract = (Arc<Roots>,), Error = Infallible> + Clone {
    warp::any().map(move || roots.clone())
}

fn query_dir(query: &Query, fallback: &Path) -> PathBuf {
    query
        .get("dir")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| fallback.to_path_buf())
}

async fn handle_browse(query: Query, roots: Arc<Roots>) -> Result<Json, Infallible> {
    let dir = query_dir(&query, &roots.browse_root);
    debug!(dir = %dir.display(), "browse");
    Ok(envelope(on_disk(move || browse(&dir)).await))
}

async fn handle_read(query: Query) -> Result<Json, Infallible> {
    let Some(path) = query.get("path").filter(|p| !p.is_empty()).map(PathBuf::from) else {
        return Ok(envelope::<Document>(Err("path parameter required".to_string())));
    };
    debug!(path = %path.display(), "read");
    Ok(envelope(on_disk(move || read_document(&path)).await))
}

async fn handle_files(query: Query, roots: Arc<Roots>) -> Result<Json, Infallible> {
    let dir = query_dir(&query, &roots.default_root);
    debug!(dir = %dir.display(), "files");
    Ok(envelope(on_disk(move || list_markdown(&dir)).await))
}

pub fn routes(config: MdViewerConfig) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let MdViewerConfig {
        default_root,
        browse_root,
        public_dir,
        ..
    } = config;
    let roots = Arc::new(Roots {
        default_root,
        browse_root,
    });
    let api = warp::path("api");

    let browse = api
        .and(warp::path("browse"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<Query>())
        .and(with_roots(roots.clone()))
        .and_then(handle_browse);

    let read = api
        .and(warp::path("read"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<Query>())
        .and_then(handle_read);

    let files = api
        .and(warp::path("files"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<Query>())
        .and(with_roots(roots.clone()))
        .and_then(handle_files);

    let settings = api
        .and(warp::path("config"))
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            warp::reply::json(&serde_json::json!({
                "defaultRoot": display(&roots.default_root),
                "browseRoot": display(&roots.browse_root),
            }))
        });

    let static_files = warp::get().and(warp::fs::dir(public_dir));

    browse.or(read).or(files).or(settings).or(static_files)
}

#[cfg(test)]
mod tests;
