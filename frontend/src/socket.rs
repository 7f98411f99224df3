use std::rc::Rc;

use futures::lock::Mutex;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use gloo_net::websocket::{futures::WebSocket, Message};
use log::{debug, error, info};
use shared::session::Outbound;
use wasm_bindgen_futures::spawn_local;
use yew::Callback;

/// Write half of the server connection. Reads are pumped into callbacks.
#[derive(Clone)]
pub struct SocketWriter {
    write: Rc<Mutex<SplitSink<WebSocket, Message>>>,
}

impl SocketWriter {
    pub fn send(&self, outbound: Outbound) {
        let text = outbound.encode();
        let write = self.write.clone();
        spawn_local(async move {
            if let Err(e) = write.lock().await.send(Message::Text(text)).await {
                error!("Failed to send {}: {:?}", outbound.request.event_name(), e);
            }
        });
    }

    pub fn send_all(&self, outbound: Vec<Outbound>) {
        for frame in outbound {
            self.send(frame);
        }
    }

    pub fn close(self) {
        spawn_local(async move {
            if let Err(e) = self.write.lock().await.close().await {
                error!("Error closing WebSocket: {:?}", e);
            }
        });
    }
}

/// Opens the socket and forwards every text frame to `on_text`.
///
/// Sends made before the handshake completes wait for it.
/// `on_error` fires once if the transport fails.
pub fn connect(
    url: &str,
    on_text: Callback<String>,
    on_error: Callback<String>,
) -> Result<SocketWriter, String> {
    info!("Connecting to WebSocket at: {}", url);
    let ws = WebSocket::open(url).map_err(|e| format!("Failed to connect to WebSocket: {:?}", e))?;
    let (write, mut read) = ws.split();

    spawn_local(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => on_text.emit(text),
                Ok(Message::Bytes(_)) => debug!("ignoring binary frame"),
                Err(e) => {
                    error!("WebSocket error: {:?}", e);
                    on_error.emit(format!("Connection lost: {:?}", e));
                    break;
                }
            }
        }
        debug!("WebSocket connection closed");
    });

    info!("WebSocket connected successfully");
    Ok(SocketWriter {
        write: Rc::new(Mutex::new(write)),
    })
}
