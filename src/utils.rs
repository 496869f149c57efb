#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {}

/// 输出到浏览器控制台；非 wasm 目标下走 tracing。
#[cfg(target_arch = "wasm32")]
pub fn console_log(message: &str) {
    web_sys::console::log_1(&message.into());
}

#[cfg(not(target_arch = "wasm32"))]
pub fn console_log(message: &str) {
    tracing::info!(target: "console", "{message}");
}

/// 把一条格式化好的 tracing 记录整行写到浏览器控制台。
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
pub struct ConsoleWriter {
    buffer: Vec<u8>,
}

#[cfg(target_arch = "wasm32")]
impl std::io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        console_log(line.trim_end());
    }
}

#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeConsoleWriter;

#[cfg(target_arch = "wasm32")]
impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for MakeConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter::default()
    }
}

/// 安装把引擎日志转发到浏览器控制台的 subscriber，重复调用无副作用。
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(MakeConsoleWriter)
        .without_time()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

/// 原生目标由宿主程序或测试自行安装 subscriber。
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {}
