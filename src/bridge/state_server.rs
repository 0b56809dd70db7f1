// ABOUTME: Scene state HTTP endpoint
// ABOUTME: Walks the host scene graph into a JSON tree and serves it for `GET /`

use crate::bridge::host::SceneProvider;
use crate::error::Error;
use crate::protocol::http::{self, RequestKind};
use crate::protocol::messages::{SceneNode, SceneTree, SourceNode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

/// Groups nested deeper than this are not descended into
pub const MAX_GROUP_DEPTH: usize = 64;

/// Build the full scene tree, depth first, in host enumeration order
pub fn build_scene_tree(provider: &dyn SceneProvider) -> SceneTree {
    let scenes = provider
        .scene_names()
        .into_iter()
        .map(|scene| {
            let sources = build_sources(provider, &scene, None, &scene, 0);
            SceneNode {
                name: scene,
                sources,
            }
        })
        .collect();

    SceneTree { scenes }
}

fn build_sources(
    provider: &dyn SceneProvider,
    scene: &str,
    group: Option<&str>,
    parent_path: &str,
    depth: usize,
) -> Vec<SourceNode> {
    provider
        .scene_items(scene, group)
        .into_iter()
        .map(|item| {
            let path = format!("{}/{}", parent_path, item.name);
            let sources = if !item.is_group {
                Vec::new()
            } else if depth >= MAX_GROUP_DEPTH {
                log::warn!("Group nesting too deep at {}, not descending", path);
                Vec::new()
            } else {
                build_sources(provider, scene, Some(&item.name), &path, depth + 1)
            };

            SourceNode {
                filters: provider.source_filters(&item.name),
                name: item.name,
                path,
                is_group: item.is_group,
                sources,
            }
        })
        .collect()
}

/// Handle to a running state endpoint
pub struct StateServer {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl StateServer {
    /// Bind `addr` and start serving on the current tokio runtime
    pub async fn spawn(
        addr: SocketAddr,
        provider: Arc<dyn SceneProvider>,
        request_timeout: Duration,
    ) -> crate::Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| {
            log::error!("State endpoint bind failed on {}: {}", addr, source);
            Error::Bind { addr, source }
        })?;
        let local_addr = listener.local_addr()?;
        let (shutdown, shutdown_rx) = watch::channel(false);

        log::info!("Scene state endpoint listening on http://{}/", local_addr);
        let handle = tokio::spawn(accept_loop(listener, provider, request_timeout, shutdown_rx));

        Ok(Self {
            local_addr,
            shutdown,
            handle,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and wait for the accept loop to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
        log::info!("Scene state endpoint on {} stopped", self.local_addr);
    }
}

async fn accept_loop(
    listener: TcpListener,
    provider: Arc<dyn SceneProvider>,
    request_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let provider = Arc::clone(&provider);
                    tokio::spawn(async move {
                        let served =
                            serve_connection(stream, provider.as_ref(), request_timeout).await;
                        if let Err(e) = served {
                            log::debug!("State request from {} failed: {}", peer, e);
                        }
                    });
                }
                Err(e) => log::warn!("State endpoint accept failed: {}", e),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Serve exactly one request on `stream`, then close it
pub async fn serve_connection(
    mut stream: TcpStream,
    provider: &dyn SceneProvider,
    request_timeout: Duration,
) -> crate::Result<RequestKind> {
    let head = tokio::time::timeout(request_timeout, http::read_request_head(&mut stream)).await;
    let kind = match head {
        Ok(Ok(head)) => http::classify_request(&head),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => RequestKind::BadRequest,
    };

    let body = match kind {
        RequestKind::State => serde_json::to_string(&build_scene_tree(provider))?,
        other => http::error_body(other),
    };
    log::debug!("State request classified as {:?}", kind);

    stream.write_all(&http::render_response(kind, &body)).await?;
    stream.shutdown().await?;
    Ok(kind)
}
