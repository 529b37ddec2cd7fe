//! Network availability checks run before every mutating call.

use std::net::{ToSocketAddrs, UdpSocket};
use std::sync::Arc;

/// Answers whether an active network path exists right now
///
/// Implementations may block (DNS, JNI); [`check`] runs them on the blocking pool.
pub trait Connectivity: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Runs the probe without holding up the async worker threads
pub async fn check(connectivity: Arc<dyn Connectivity>) -> bool {
    match tokio::task::spawn_blocking(move || connectivity.is_connected()).await {
        Ok(connected) => connected,
        Err(e) => {
            log::error!("Connectivity probe did not finish: {}", e);
            false
        }
    }
}

/// Fixed answer, for hosts that manage connectivity themselves and for tests
#[derive(Debug, Clone, Copy)]
pub struct StaticConnectivity(pub bool);

impl Connectivity for StaticConnectivity {
    fn is_connected(&self) -> bool {
        self.0
    }
}

/// Platform probe.
///
/// On Android this asks `ConnectivityManager` for the active network. Elsewhere
/// it resolves the backend host and checks that the OS has a route to it
/// (a connected UDP socket sends nothing).
#[derive(Debug, Clone)]
pub struct SystemConnectivity {
    host: String,
    port: u16,
}

impl SystemConnectivity {
    /// Probe towards the host of `base_url`
    pub fn for_url(base_url: &str) -> Self {
        let (host, port) = match reqwest::Url::parse(base_url) {
            Ok(url) => (
                url.host_str().unwrap_or_default().to_string(),
                url.port_or_known_default().unwrap_or(443),
            ),
            Err(_) => (String::new(), 443),
        };
        Self { host, port }
    }

    fn has_route(&self) -> bool {
        if self.host.is_empty() {
            return false;
        }
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!("Cannot resolve {}: {}", self.host, e);
                return false;
            }
        };
        for addr in addrs {
            let bind = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
            if let Ok(socket) = UdpSocket::bind(bind) {
                if socket.connect(addr).is_ok() {
                    return true;
                }
            }
        }
        false
    }
}

impl Connectivity for SystemConnectivity {
    #[cfg(target_os = "android")]
    fn is_connected(&self) -> bool {
        match android_is_connected() {
            Some(connected) => connected,
            None => {
                log::warn!("ConnectivityManager unavailable, probing route instead");
                self.has_route()
            }
        }
    }

    #[cfg(not(target_os = "android"))]
    fn is_connected(&self) -> bool {
        self.has_route()
    }
}

#[cfg(target_os = "android")]
fn android_is_connected() -> Option<bool> {
    use jni::objects::{JObject, JValue};
    use jni::JavaVM;

    unsafe {
        let ctx = ndk_context::android_context();
        let vm = JavaVM::from_raw(ctx.vm().cast()).ok()?;
        let mut env = vm.attach_current_thread().ok()?;
        let context = JObject::from_raw(ctx.context().cast());

        let service_name = env.new_string("connectivity").ok()?;
        let manager = env
            .call_method(
                &context,
                "getSystemService",
                "(Ljava/lang/String;)Ljava/lang/Object;",
                &[JValue::Object(&service_name)],
            )
            .ok()?
            .l()
            .ok()?;
        if manager.is_null() {
            return Some(false);
        }

        let info = env
            .call_method(
                &manager,
                "getActiveNetworkInfo",
                "()Landroid/net/NetworkInfo;",
                &[],
            )
            .ok()?
            .l()
            .ok()?;
        if info.is_null() {
            return Some(false);
        }

        env.call_method(&info, "isConnectedOrConnecting", "()Z", &[])
            .ok()?
            .z()
            .ok()
    }
}
