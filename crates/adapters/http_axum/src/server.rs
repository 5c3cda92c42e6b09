//! Listener lifecycle behind the [`AccessoryServer`] port.

use std::net::SocketAddr;
use std::sync::Arc;

use hkbridge_app::ports::{Accessory, AccessoryServer};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::HttpError;
use crate::router;
use crate::state::AppState;

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
}

/// Serves the controller surface for a fixed set of accessories.
pub struct HttpAccessoryServer {
    config: ServerConfig,
    running: Option<Running>,
}

impl HttpAccessoryServer {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }

    /// Address actually bound, once started.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }
}

impl<A> AccessoryServer<A> for HttpAccessoryServer
where
    A: Accessory + 'static,
{
    type Error = HttpError;

    async fn start(&mut self, accessories: Vec<Arc<A>>) -> Result<(), HttpError> {
        if self.running.is_some() {
            return Err(HttpError::AlreadyRunning);
        }

        let storage = &self.config.storage_path;
        tokio::fs::create_dir_all(storage)
            .await
            .map_err(|source| HttpError::Storage {
                path: storage.clone(),
                source,
            })?;

        let addr = self.config.bind_addr();
        let bind_error = |source| HttpError::Bind {
            addr: addr.clone(),
            source,
        };
        let listener = TcpListener::bind(&addr).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let count = accessories.len();
        let app = router::build(AppState::new(accessories, &self.config.pin));
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        tracing::info!(%local_addr, accessories = count, "controller surface listening");
        self.running = Some(Running {
            shutdown,
            task,
            local_addr,
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), HttpError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        let _ = running.shutdown.send(());
        running
            .task
            .await
            .map_err(HttpError::Join)?
            .map_err(HttpError::Serve)?;
        tracing::info!("controller surface stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hkbridge_app::ports::{Characteristic, RemoteUpdateHandler};
    use hkbridge_domain::characteristic::{CharacteristicKind, CharacteristicValue};
    use hkbridge_domain::descriptor::AccessoryDescriptor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    struct NoCharacteristic;

    impl Characteristic for NoCharacteristic {
        fn kind(&self) -> CharacteristicKind {
            CharacteristicKind::On
        }
        fn value(&self) -> CharacteristicValue {
            CharacteristicValue::Bool(false)
        }
        fn set_from_binding(&self, _value: CharacteristicValue) {}
        fn set_from_controller(&self, _value: CharacteristicValue) {}
        fn on_remote_update(&self, _handler: RemoteUpdateHandler) {}
        fn clear_remote_update(&self) {}
    }

    struct EmptyAccessory;

    impl Accessory for EmptyAccessory {
        type Characteristic = NoCharacteristic;

        fn descriptor(&self) -> &AccessoryDescriptor {
            unreachable!("not listed in these tests")
        }
        fn characteristic(&self, _kind: CharacteristicKind) -> Option<Arc<NoCharacteristic>> {
            None
        }
        fn characteristics(&self) -> Vec<Arc<NoCharacteristic>> {
            Vec::new()
        }
    }

    fn config(storage_path: PathBuf) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            storage_path,
            ..ServerConfig::default()
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hkbridge-{name}-{}", std::process::id()))
    }

    #[tokio::test]
    async fn should_create_storage_and_serve_until_stopped() {
        let storage = scratch_dir("serve");
        let mut server = HttpAccessoryServer::new(config(storage.join("nested")));

        AccessoryServer::<EmptyAccessory>::start(&mut server, Vec::new())
            .await
            .unwrap();
        assert!(storage.join("nested").is_dir());

        let addr = server.local_addr().unwrap();
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("OK"));

        AccessoryServer::<EmptyAccessory>::stop(&mut server)
            .await
            .unwrap();
        assert!(server.local_addr().is_none());
        let _ = std::fs::remove_dir_all(storage);
    }

    #[tokio::test]
    async fn should_refuse_to_start_twice() {
        let storage = scratch_dir("twice");
        let mut server = HttpAccessoryServer::new(config(storage.clone()));
        AccessoryServer::<EmptyAccessory>::start(&mut server, Vec::new())
            .await
            .unwrap();

        let second = AccessoryServer::<EmptyAccessory>::start(&mut server, Vec::new()).await;

        assert!(matches!(second, Err(HttpError::AlreadyRunning)));
        AccessoryServer::<EmptyAccessory>::stop(&mut server)
            .await
            .unwrap();
        let _ = std::fs::remove_dir_all(storage);
    }

    #[tokio::test]
    async fn should_stop_without_start() {
        let mut server = HttpAccessoryServer::new(ServerConfig::default());
        assert!(
            AccessoryServer::<EmptyAccessory>::stop(&mut server)
                .await
                .is_ok()
        );
    }
}
