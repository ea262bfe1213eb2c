// Copyright 2026 the LocalFeed Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout` wake driver.
//!
//! Wakes are never cancelled: each carries the token it needs to notice it
//! went stale, so a one-shot closure per wake is all the driver needs.

use core::time::Duration;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

// Direct global bindings, as with `requestAnimationFrame`: no Window lookup
// per timer.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(handler: &JsValue, timeout: i32) -> i32;

    #[wasm_bindgen(js_namespace = performance, js_name = "now")]
    pub(crate) fn performance_now() -> f64;
}

/// Clamps a delay to the millisecond range `setTimeout` accepts.
pub(crate) fn timeout_ms(delay: Duration) -> i32 {
    i32::try_from(delay.as_millis()).unwrap_or(i32::MAX)
}

/// Runs `f` once after `delay`.
pub(crate) fn after(delay: Duration, f: impl FnOnce() + 'static) {
    let handler = Closure::once_into_js(f);
    set_timeout(&handler, timeout_ms(delay));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_clamp_to_i32() {
        assert_eq!(timeout_ms(Duration::from_millis(150)), 150);
        assert_eq!(timeout_ms(Duration::from_micros(900)), 0);
        assert_eq!(timeout_ms(Duration::from_secs(u64::MAX)), i32::MAX);
    }
}
