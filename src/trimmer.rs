use crate::config::TrimConfig;
use crate::types::{dbfs_of, AudioBuffer, Window};

/// 先頭・末尾の無音区間の境界を求める
///
/// 位置0から `scan_window_ms` 幅の非重複ウィンドウで前方スキャンし、
/// レベルが閾値未満のウィンドウを読み飛ばす。閾値以上のウィンドウが
/// 現れた時点で開始カーソルを確定する。末尾からも対称に後方スキャン
/// する。
///
/// 後方スキャンは前方スキャンが確定した位置＋1ウィンドウを越えない。
/// 越える場合はその側のトリミングを打ち切り、範囲の反転を防ぐ。
/// トリミングはベストエフォートであり、この関数がエラーを返すことは
/// ない。バッファ全体が1ウィンドウ以下の場合は全範囲を返す。
pub fn trim_bounds(buffer: &AudioBuffer, config: &TrimConfig) -> Window {
    let total_ms = buffer.duration_ms();
    let window_ms = config.scan_window_ms;

    // 1ウィンドウ以下は安全にトリミングできない
    if total_ms <= window_ms {
        return Window::new(0, total_ms);
    }

    // 前方スキャン
    let mut start_ms: u64 = 0;
    while start_ms + window_ms < total_ms {
        let level = dbfs_of(buffer.window(Window::new(start_ms, start_ms + window_ms)));
        if level >= config.silence_threshold_dbfs {
            break;
        }
        start_ms += window_ms;
    }

    // 後方スキャン。前方カーソル+1ウィンドウを越えたら打ち切り
    let mut end_ms: u64 = total_ms;
    while end_ms.saturating_sub(window_ms) > start_ms + window_ms {
        let level = dbfs_of(buffer.window(Window::new(end_ms - window_ms, end_ms)));
        if level >= config.silence_threshold_dbfs {
            break;
        }
        end_ms -= window_ms;
    }

    Window::new(start_ms, end_ms)
}

/// 先頭・末尾の無音を取り除いたバッファを返す
pub fn trim_silence(buffer: &AudioBuffer, config: &TrimConfig) -> AudioBuffer {
    let bounds = trim_bounds(buffer, config);
    if bounds.start_ms == 0 && bounds.end_ms == buffer.duration_ms() {
        return buffer.clone();
    }
    log::info!(
        "無音トリミング: {} ms → {} ms (先頭 {} ms, 末尾 {} ms を除去)",
        buffer.duration_ms(),
        bounds.duration_ms(),
        bounds.start_ms,
        buffer.duration_ms() - bounds.end_ms
    );
    buffer.extract(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 24000;

    fn config() -> TrimConfig {
        TrimConfig {
            silence_threshold_dbfs: -45.0,
            scan_window_ms: 300,
        }
    }

    /// 無音と音声（440 Hzサイン波）を連結したバッファを作る
    fn build_buffer(sections: &[(u64, bool)]) -> AudioBuffer {
        let mut samples = Vec::new();
        for &(ms, voiced) in sections {
            let count = (ms * SR as u64 / 1000) as usize;
            if voiced {
                for i in 0..count {
                    let t = i as f32 / SR as f32;
                    samples.push((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.3);
                }
            } else {
                samples.extend(std::iter::repeat(0.0).take(count));
            }
        }
        AudioBuffer::new(samples, SR)
    }

    #[test]
    fn test_trim_leading_silence() {
        // 先頭1.5秒無音 + 3秒音声
        let buffer = build_buffer(&[(1500, false), (3000, true)]);
        let bounds = trim_bounds(&buffer, &config());
        assert_eq!(bounds.start_ms, 1500);
        assert_eq!(bounds.end_ms, 4500);
    }

    #[test]
    fn test_trim_trailing_silence() {
        // 3秒音声 + 末尾1.2秒無音
        let buffer = build_buffer(&[(3000, true), (1200, false)]);
        let bounds = trim_bounds(&buffer, &config());
        assert_eq!(bounds.start_ms, 0);
        // 末尾は300ms刻みで縮む
        assert!(bounds.end_ms <= 3300);
        assert!(bounds.end_ms >= 3000);
    }

    #[test]
    fn test_trim_both_sides() {
        let buffer = build_buffer(&[(900, false), (2000, true), (900, false)]);
        let trimmed = trim_silence(&buffer, &config());
        // 中央の音声はおおむね残る
        assert!(trimmed.duration_ms() >= 2000);
        assert!(trimmed.duration_ms() <= 2600);
    }

    #[test]
    fn test_no_trim_for_voiced_buffer() {
        let buffer = build_buffer(&[(3000, true)]);
        let bounds = trim_bounds(&buffer, &config());
        assert_eq!(bounds, Window::new(0, 3000));
    }

    #[test]
    fn test_short_buffer_unchanged() {
        // 1ウィンドウ以下は安全のためそのまま返す
        let buffer = build_buffer(&[(200, false)]);
        let trimmed = trim_silence(&buffer, &config());
        assert_eq!(trimmed.duration_ms(), buffer.duration_ms());
    }

    #[test]
    fn test_trim_is_idempotent() {
        let buffer = build_buffer(&[(1200, false), (2400, true), (600, false)]);
        let once = trim_silence(&buffer, &config());
        let twice = trim_silence(&once, &config());
        assert_eq!(once.duration_ms(), twice.duration_ms());
        assert_eq!(once.samples.len(), twice.samples.len());
    }

    #[test]
    fn test_all_silent_buffer_does_not_invert() {
        // 全無音: 後方スキャンは前方カーソルを越えず、範囲は反転しない
        let buffer = build_buffer(&[(3000, false)]);
        let bounds = trim_bounds(&buffer, &config());
        assert!(bounds.start_ms < bounds.end_ms);
        assert!(bounds.end_ms <= 3000);
    }

    #[test]
    fn test_backward_scan_boundary_guard() {
        // 前方スキャンで開始位置が確定した後、残りが2ウィンドウ以下なら
        // 後方スキャンは1回も縮めない（`end - w > start + w` の境界固定）
        let buffer = build_buffer(&[(600, false), (300, true), (300, false)]);
        let bounds = trim_bounds(&buffer, &config());
        assert_eq!(bounds.start_ms, 600);
        // end=1200: 1200-300=900 > 600+300=900 は偽なので縮まない
        assert_eq!(bounds.end_ms, 1200);
    }
}
