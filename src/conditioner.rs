use crate::config::ConditionerConfig;
use crate::types::{AudioBuffer, SILENCE_FLOOR_DBFS};

/// 信号コンディショナ
///
/// 連結済みタイムラインに対して次を順番に適用する。
///
/// 1. ハイパスフィルタ（デフォルト 80 Hz）で低域のうなりを除去
/// 2. ローパスフィルタ（デフォルト 8000 Hz）で高域ノイズを除去
/// 3. `target_dbfs - 現在のdBFS` の一様ゲインでラウドネス正規化
///
/// 完全無音のバッファは測定レベルが下限値に張り付き、必要ゲインが
/// 発散するため、正規化をスキップする（エネルギーが無い入力への
/// 明示的なポリシー）。外部I/Oは行わず、バッファの変更のみ。
pub fn condition(buffer: &mut AudioBuffer, config: &ConditionerConfig) {
    high_pass_filter(buffer, config.highpass_hz);
    low_pass_filter(buffer, config.lowpass_hz);
    normalize_to(buffer, config.target_dbfs);
}

/// 一次RCハイパスフィルタ
///
/// `y[i] = alpha * (y[i-1] + x[i] - x[i-1])`,
/// `alpha = RC / (RC + dt)`, `RC = 1 / (2π * cutoff)`
pub fn high_pass_filter(buffer: &mut AudioBuffer, cutoff_hz: f32) {
    if cutoff_hz <= 0.0 || buffer.samples.is_empty() {
        return;
    }
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / buffer.sample_rate as f32;
    let alpha = rc / (rc + dt);

    let mut prev_input = 0.0f32;
    let mut prev_output = 0.0f32;

    for sample in &mut buffer.samples {
        let current_input = *sample;
        *sample = alpha * (prev_output + current_input - prev_input);
        prev_input = current_input;
        prev_output = *sample;
    }
}

/// 一次RCローパスフィルタ
///
/// `y[i] = y[i-1] + alpha * (x[i] - y[i-1])`, `alpha = dt / (RC + dt)`
pub fn low_pass_filter(buffer: &mut AudioBuffer, cutoff_hz: f32) {
    if cutoff_hz <= 0.0 || buffer.samples.is_empty() {
        return;
    }
    let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
    let dt = 1.0 / buffer.sample_rate as f32;
    let alpha = dt / (rc + dt);

    let mut prev_output = 0.0f32;

    for sample in &mut buffer.samples {
        prev_output += alpha * (*sample - prev_output);
        *sample = prev_output;
    }
}

/// ラウドネスを目標 dBFS に正規化
///
/// 測定レベルが無音下限に張り付いている場合は何もしない。
pub fn normalize_to(buffer: &mut AudioBuffer, target_dbfs: f32) {
    let current_dbfs = buffer.dbfs();
    if current_dbfs <= SILENCE_FLOOR_DBFS {
        log::warn!("バッファにエネルギーがないため正規化をスキップします");
        return;
    }
    let change_db = target_dbfs - current_dbfs;
    log::debug!(
        "正規化: {:.2} dBFS → {:.2} dBFS (ゲイン {:+.2} dB)",
        current_dbfs,
        target_dbfs,
        change_db
    );
    buffer.apply_gain(change_db);
}
