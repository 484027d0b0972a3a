use std::future::Future;

/// Runs a future in the background without awaiting it.
#[cfg(target_arch = "wasm32")]
pub fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Runs a future in the background without awaiting it.
///
/// Inside a Tokio runtime the task is spawned on it; otherwise a short-lived thread drives it to
/// completion.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn_detached<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    use tokio::runtime::Handle;

    if let Ok(handle) = Handle::try_current() {
        handle.spawn(future);
    } else {
        std::thread::spawn(move || futures::executor::block_on(future));
    }
}
