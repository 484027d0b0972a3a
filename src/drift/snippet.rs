use chrono::{DateTime, Utc};
use url::Url;

use crate::drift::constants::{DEFAULT_SCRIPT_BASE_URL, SCRIPT_BASE_URL_ENV, SCRIPT_CACHE_BUCKET_MILLIS};
use crate::drift::error::{invalid_argument, DriftResult};

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
pub use web::{BrowserWidget, BrowserWidgetHost};

/// Builds the widget script URL for `drift_id`.
///
/// The path embeds `now` rounded up to the next five minute boundary so browsers refetch the
/// script at most that often. The base URL honors `DRIFT_SCRIPT_BASE_URL` when set.
pub fn snippet_url(drift_id: &str, now: DateTime<Utc>) -> DriftResult<Url> {
    let base = resolve_base_url(std::env::var(SCRIPT_BASE_URL_ENV).ok());
    snippet_url_with_base(&base, drift_id, now)
}

pub fn snippet_url_with_base(base: &str, drift_id: &str, now: DateTime<Utc>) -> DriftResult<Url> {
    let drift_id = drift_id.trim();
    if drift_id.is_empty() {
        return Err(invalid_argument("driftId must not be empty"));
    }

    let mut url = Url::parse(base)
        .map_err(|err| invalid_argument(format!("invalid Drift script base URL `{base}`: {err}")))?;
    let bucket = cache_bucket(now.timestamp_millis()).to_string();
    let file = format!("{drift_id}.js");
    url.path_segments_mut()
        .map_err(|_| invalid_argument(format!("Drift script base URL `{base}` cannot carry a path")))?
        .pop_if_empty()
        .extend(["include", bucket.as_str(), file.as_str()]);
    Ok(url)
}

/// Rounds a millisecond timestamp up to the cache bucket boundary.
pub fn cache_bucket(now_millis: i64) -> i64 {
    (now_millis + SCRIPT_CACHE_BUCKET_MILLIS - 1).div_euclid(SCRIPT_CACHE_BUCKET_MILLIS)
        * SCRIPT_CACHE_BUCKET_MILLIS
}

fn resolve_base_url(configured: Option<String>) -> String {
    configured
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_SCRIPT_BASE_URL.to_string())
}

#[cfg(all(feature = "wasm-web", target_arch = "wasm32"))]
mod web {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use js_sys::{Array, Function, Reflect};
    use serde::Serialize;
    use serde_json::Value;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    use super::snippet_url;
    use crate::drift::constants::SNIPPET_VERSION;
    use crate::drift::types::{NativeEvent, Properties};
    use crate::drift::widget::{DriftWidget, IdentifyOptions, NativeEventHandler, WidgetHost};

    /// Methods the queueing stub accepts before the real widget script replaces it.
    const STUB_METHODS: [&str; 11] = [
        "identify", "config", "track", "reset", "debug", "show", "ping", "page", "hide", "off", "on",
    ];

    /// Installs the Drift snippet on the page and exposes `window.drift`.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct BrowserWidgetHost;

    impl BrowserWidgetHost {
        pub fn new() -> Self {
            Self
        }
    }

    impl WidgetHost for BrowserWidgetHost {
        fn install_snippet(&self) -> bool {
            let global = js_sys::global();
            let invoked = lookup(&global, "driftt")
                .and_then(|stub| lookup(&stub, "invoked"))
                .map(|flag| flag.is_truthy())
                .unwrap_or(false);
            if invoked {
                return false;
            }
            match install_stub(&global) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("failed to install the Drift snippet: {err:?}");
                    false
                }
            }
        }

        fn widget(&self) -> Option<Arc<dyn DriftWidget>> {
            lookup(&js_sys::global(), "drift").map(|_| Arc::new(BrowserWidget) as Arc<dyn DriftWidget>)
        }
    }

    /// Handle to the page's `window.drift` object. Every call looks the global up again, so the
    /// handle keeps working after the loaded script replaces the stub.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct BrowserWidget;

    impl DriftWidget for BrowserWidget {
        fn load(&self, drift_id: &str) {
            if let Err(err) = inject_script(drift_id) {
                log::error!("failed to inject the Drift widget script: {err:?}");
            }
        }

        fn has_initialized(&self) -> bool {
            drift()
                .and_then(|drift| lookup(&drift, "hasInitialized"))
                .map(|flag| flag.is_truthy())
                .unwrap_or(false)
        }

        fn api_ready(&self) -> bool {
            drift().and_then(|drift| lookup(&drift, "api")).is_some()
        }

        fn page(&self) {
            report("page", call_drift("page", &[]));
        }

        fn track(&self, event: &str, properties: &Properties) {
            let result = to_js(properties)
                .and_then(|properties| call_drift("track", &[JsValue::from_str(event), properties]));
            report("track", result);
        }

        fn identify(&self, user_id: &str, traits: &Properties, options: Option<&IdentifyOptions>) {
            let result = (|| {
                let mut args = vec![JsValue::from_str(user_id), to_js(traits)?];
                if let Some(options) = options {
                    args.push(to_js(options)?);
                }
                call_drift("identify", &args)
            })();
            report("identify", result);
        }

        fn set_user_attributes(&self, attributes: &Properties) {
            let result = (|| {
                let api = drift()
                    .and_then(|drift| lookup(&drift, "api"))
                    .ok_or_else(|| JsValue::from_str("drift.api is not available"))?;
                invoke(&api, "setUserAttributes", &[to_js(attributes)?])
            })();
            report("setUserAttributes", result);
        }

        fn on(&self, event: &str, handler: NativeEventHandler) {
            let listener = Closure::wrap(Box::new(move |data: JsValue, meta: JsValue| {
                let data = from_js(data).unwrap_or(Value::Null);
                let native = match from_js(meta) {
                    Some(meta) => NativeEvent::with_meta(data, meta),
                    None => NativeEvent::new(data),
                };
                handler(&native);
            }) as Box<dyn FnMut(JsValue, JsValue)>);
            let result = call_drift("on", &[JsValue::from_str(event), listener.as_ref().clone()]);
            listener.forget();
            report("on", result);
        }
    }

    fn install_stub(global: &JsValue) -> Result<(), JsValue> {
        let stub = Array::new();
        Reflect::set(&stub, &JsValue::from_str("invoked"), &JsValue::TRUE)?;
        Reflect::set(
            &stub,
            &JsValue::from_str("SNIPPET_VERSION"),
            &JsValue::from_str(SNIPPET_VERSION),
        )?;

        for method in STUB_METHODS {
            let queue = stub.clone();
            let name = method.to_string();
            let enqueue = Closure::wrap(Box::new(move |a: JsValue, b: JsValue, c: JsValue| -> JsValue {
                let call = Array::of1(&JsValue::from_str(&name));
                for arg in [a, b, c] {
                    if !arg.is_undefined() {
                        call.push(&arg);
                    }
                }
                queue.push(&call);
                queue.clone().into()
            }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);
            Reflect::set(&stub, &JsValue::from_str(method), enqueue.as_ref())?;
            enqueue.forget();
        }

        Reflect::set(global, &JsValue::from_str("driftt"), &stub)?;
        Reflect::set(global, &JsValue::from_str("drift"), &stub)?;
        Ok(())
    }

    fn inject_script(drift_id: &str) -> Result<(), JsValue> {
        let now = DateTime::<Utc>::from_timestamp_millis(js_sys::Date::now() as i64)
            .ok_or_else(|| JsValue::from_str("clock out of range"))?;
        let url = snippet_url(drift_id, now).map_err(|err| JsValue::from_str(&err.to_string()))?;

        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let script = document
            .create_element("script")?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(JsValue::from)?;
        script.set_type("text/javascript");
        script.set_async(true);
        script.set_cross_origin(Some("anonymous"));
        script.set_src(url.as_str());

        let head = document
            .head()
            .ok_or_else(|| JsValue::from_str("document head not available"))?;
        head.append_child(&script)?;
        Ok(())
    }

    fn drift() -> Option<JsValue> {
        lookup(&js_sys::global(), "drift")
    }

    fn lookup(target: &JsValue, key: &str) -> Option<JsValue> {
        let value = Reflect::get(target, &JsValue::from_str(key)).ok()?;
        if value.is_null() || value.is_undefined() {
            None
        } else {
            Some(value)
        }
    }

    fn call_drift(method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        let drift = drift().ok_or_else(|| JsValue::from_str("window.drift is not defined"))?;
        invoke(&drift, method, args)
    }

    fn invoke(target: &JsValue, method: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
        let function = Reflect::get(target, &JsValue::from_str(method))?.dyn_into::<Function>()?;
        let args: Array = args.iter().collect();
        function.apply(target, &args)
    }

    fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
        value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(JsValue::from)
    }

    fn from_js(value: JsValue) -> Option<Value> {
        if value.is_undefined() {
            return None;
        }
        serde_wasm_bindgen::from_value(value).ok()
    }

    fn report(method: &str, result: Result<JsValue, JsValue>) {
        if let Err(err) = result {
            log::error!("drift.{method} failed: {err:?}");
        }
    }
}
