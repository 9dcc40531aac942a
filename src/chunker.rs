use crate::types::{AudioBuffer, Window};

/// バッファを固定長チャンクに分割
///
/// 重複も隙間もない純粋な分割。最後のチャンクは残り時間分で
/// `chunk_ms` より短くなりうる。ウィンドウはタイムライン順に
/// 0 から番号付けされる。
pub fn split_into_windows(buffer: &AudioBuffer, chunk_ms: u64) -> Vec<Window> {
    let total_ms = buffer.duration_ms();
    let mut windows = Vec::new();
    let mut start = 0;
    while start < total_ms {
        let end = (start + chunk_ms).min(total_ms);
        windows.push(Window::new(start, end));
        start = end;
    }
    windows
}
