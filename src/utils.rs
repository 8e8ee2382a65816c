//! 浏览器控制台日志与 panic hook。

/// 输出一条普通日志到浏览器控制台。
#[cfg(target_arch = "wasm32")]
pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

/// 输出一条警告到浏览器控制台。
#[cfg(target_arch = "wasm32")]
pub fn warn(message: &str) {
    web_sys::console::warn_1(&message.into());
}

// 非 wasm 目标（本地单元测试）上没有控制台可写。
#[cfg(not(target_arch = "wasm32"))]
pub fn log(_message: &str) {}

#[cfg(not(target_arch = "wasm32"))]
pub fn warn(_message: &str) {}

#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}
