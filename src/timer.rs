/// Browser timers owned by Rust values
///
/// An `Interval` clears its browser timer when dropped, so dropping the
/// handle is the only cancellation path a caller needs.
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

pub struct Interval {
    handle: i32,
    _closure: Closure<dyn FnMut()>,
}

impl Interval {
    pub fn new(millis: i32, callback: impl FnMut() + 'static) -> Result<Interval, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        let handle = window.set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            millis,
        )?;
        Ok(Interval {
            handle,
            _closure: closure,
        })
    }

    fn clear(&self) {
        if let Some(window) = web_sys::window() {
            window.clear_interval_with_handle(self.handle);
        }
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Cancel an interval from inside its own callback.
///
/// The timer stops immediately; the closure is freed once the callback
/// has returned.
pub fn retire(interval: Interval) {
    interval.clear();
    spawn_local(async move {
        drop(interval);
    });
}

/// Run `callback` once after `millis`.
pub fn set_timeout(millis: i32, callback: impl FnOnce() + 'static) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let callback = Closure::once_into_js(callback);
    window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)?;
    Ok(())
}
