//! # Sequencer モジュール
//!
//! 着陸誘導の中核となるフェーズシーケンサを提供します。
//!
//! このモジュールは、4つの着陸フェーズ（接近→水平減速→降下開始探索→
//! 鉛直減速・接地）を厳密な順序で実行するポーリングループを管理します。
//! 各フェーズは「テレメトリ取得→コマンド計算→書き込み→スリープ→
//! 離脱判定」を繰り返す同期ブロッキングループであり、フェーズ本体は
//! `(TelemetrySample, LandingParams) -> ControlCommand` の純関数と
//! 離脱述語に分離されているため、実機テレメトリなしで単体テストできます。
//!
//! ## フェーズ別ポーリング周期
//!
//! 接地に近づくほど必要な制御権限が単調に増加するため、ポーリング周期は
//! 後段ほど短く設定します：
//!
//! 1. **接近**: 1秒（長時間・非クリティカル）
//! 2. **水平減速**: 0.1秒
//! 3. **降下開始探索**: 0.2秒
//! 4. **鉛直減速・接地**: 0.01秒（安全クリティカルな終端フェーズ）
//!
//! ## 姿勢保持則
//!
//! 全フェーズで姿勢目標を現在速度の逆方向（レトログレード）に毎反復
//! 設定し直します。専用の姿勢制御器なしで、連続更新される最適制動姿勢を
//! 安価に近似します。
//!
//! ## 離脱経路
//!
//! - 正常接地（Touchdown）
//! - 燃料枯渇中断（FuelAbort、非致命的）
//! - 伝送路障害・反復上限超過・キャンセル（エラー、当該シーケンスのみ致命的）

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn, error, debug};

use crate::guidance;
use crate::mission::MissionConfig;
use crate::vessel::common::{ControlCommand, LandingOutcome, LandingPhase, TelemetrySample, Vector3};
use crate::vessel::traits::{ActuationError, IActuation, ITelemetry, TelemetryError};

/// 着陸誘導パラメータ
///
/// シーケンス開始時に一度だけ設定され、実行中は不変です。
#[derive(Debug, Clone)]
pub struct LandingParams {
    /// 許容係数（全しきい値比較に乗じられる）
    pub tolerance_coef: f64,
    /// 接近フェーズの離脱高度（m）
    pub approach_altitude: f64,
    /// 接近フェーズ離脱に要求する降下率の上限（m/s、負値）
    pub approach_descent_gate: f64,
    /// 水平減速フェーズの離脱水平速度（m/s）
    pub horizontal_exit_speed: f64,
    /// ギア展開余裕（m）
    pub gear_margin: f64,
    /// 接地判定余裕（m）
    pub touchdown_margin: f64,
    /// 燃料枯渇中断余裕（m）
    pub fuel_abort_margin: f64,
    /// フェーズ別ポーリング周期（s）
    pub poll_approach: f64,
    pub poll_horizontal: f64,
    pub poll_descent_search: f64,
    pub poll_vertical: f64,
    /// フェーズ別最大反復回数（テレメトリ停滞時の無期限ブロック防止）
    pub max_iter_approach: u64,
    pub max_iter_horizontal: u64,
    pub max_iter_descent_search: u64,
    pub max_iter_vertical: u64,
}

impl LandingParams {
    /// ミッション設定から誘導パラメータを構築
    pub fn from_mission(config: &MissionConfig) -> Self {
        Self {
            tolerance_coef: config.landing.tolerance_coef,
            approach_altitude: config.landing.approach_altitude_m,
            approach_descent_gate: config.landing.approach_descent_gate_mps,
            horizontal_exit_speed: config.landing.horizontal_exit_mps,
            gear_margin: config.landing.gear_margin_m,
            touchdown_margin: config.landing.touchdown_margin_m,
            fuel_abort_margin: config.landing.fuel_abort_margin_m,
            poll_approach: config.polling.approach_s,
            poll_horizontal: config.polling.horizontal_s,
            poll_descent_search: config.polling.descent_search_s,
            poll_vertical: config.polling.vertical_s,
            max_iter_approach: config.limits.approach_max_iter,
            max_iter_horizontal: config.limits.horizontal_max_iter,
            max_iter_descent_search: config.limits.descent_search_max_iter,
            max_iter_vertical: config.limits.vertical_max_iter,
        }
    }
}

/// 着陸シーケンスのエラー
///
/// 伝送路障害は当該シーケンスのみの致命的エラーとして伝播し、
/// 並行する他シーケンスを汚染・阻害しません。
#[derive(Debug)]
pub enum LandingError {
    /// テレメトリ読み出し失敗
    Telemetry(LandingPhase, TelemetryError),
    /// アクチュエーション書き込み失敗
    Actuation(LandingPhase, ActuationError),
    /// フェーズの反復上限超過（テレメトリ停滞の疑い）
    PhaseTimeout { phase: LandingPhase, iterations: u64 },
    /// キャンセル信号による中断
    Cancelled(LandingPhase),
    /// 着陸タスク自体の異常終了（編隊実行時のジョイン失敗）
    TaskFailed(String),
}

impl std::fmt::Display for LandingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LandingError::Telemetry(phase, err) => {
                write!(f, "テレメトリ障害（{}フェーズ）: {}", phase.label(), err)
            }
            LandingError::Actuation(phase, err) => {
                write!(f, "アクチュエーション障害（{}フェーズ）: {}", phase.label(), err)
            }
            LandingError::PhaseTimeout { phase, iterations } => {
                write!(f, "反復上限超過（{}フェーズ、{}回）", phase.label(), iterations)
            }
            LandingError::Cancelled(phase) => {
                write!(f, "キャンセルにより中断（{}フェーズ）", phase.label())
            }
            LandingError::TaskFailed(msg) => {
                write!(f, "着陸タスクが異常終了しました: {}", msg)
            }
        }
    }
}

impl std::error::Error for LandingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LandingError::Telemetry(_, err) => Some(err),
            LandingError::Actuation(_, err) => Some(err),
            _ => None,
        }
    }
}

/// 接近フェーズのコマンド計算
///
/// 姿勢を逆行方向に保ち、スロットルは0のまま滑空します。
pub fn approach_command(sample: &TelemetrySample) -> ControlCommand {
    ControlCommand::coast(&sample.velocity)
}

/// 接近フェーズの離脱述語
///
/// 高度が実効しきい値（設定高度×許容係数）を下回り、かつ確実に降下中
/// （降下率ゲート未満）であれば離脱します。
pub fn approach_exit(sample: &TelemetrySample, params: &LandingParams) -> bool {
    sample.surface_altitude < params.approach_altitude * params.tolerance_coef
        && sample.vertical_speed < params.approach_descent_gate
}

/// 水平減速フェーズのコマンド計算
pub fn horizontal_command(sample: &TelemetrySample) -> ControlCommand {
    ControlCommand::new(
        sample.velocity.retrograde(),
        guidance::horizontal_braking_throttle(sample.horizontal_speed),
        false,
    )
}

/// 水平減速フェーズの離脱述語
pub fn horizontal_exit(sample: &TelemetrySample, params: &LandingParams) -> bool {
    sample.horizontal_speed < params.horizontal_exit_speed
}

/// 降下開始探索フェーズの目標高度計算
///
/// 毎反復で降下開始高度を再計算します。推力重量比不足時は無限大
/// （降下噴射を開始しない）が返ります。
pub fn descent_search_target_height(sample: &TelemetrySample, params: &LandingParams) -> f64 {
    guidance::burn_start_altitude(
        sample.vertical_speed,
        params.tolerance_coef,
        sample.available_thrust,
        sample.mass,
        sample.surface_gravity,
        sample.com_offset,
    )
}

/// 鉛直減速フェーズの1反復分の判断
#[derive(Debug, Clone, Copy)]
pub enum VerticalDecision {
    /// ループ継続
    Continue(ControlCommand),
    /// 接地完了（スロットル0でシーケンス終了）
    Touchdown(ControlCommand),
    /// 燃料枯渇中断（安全高度より上、スロットル0で離脱）
    FuelAbort(ControlCommand),
}

/// 鉛直減速フェーズのコマンド計算と離脱判断
///
/// 着陸高さ上のギア余裕に入ったらギアを展開し、接地余裕に入ったら
/// スロットルを切って終了します。上昇（バウンド）中はスロットルを切って
/// ループを継続し、燃料が下限未満かつ安全余裕より上なら燃料枯渇中断
/// とします。ギアフラグは単調で、一度trueになったら以後falseに戻しません。
pub fn vertical_step(
    sample: &TelemetrySample,
    params: &LandingParams,
    gear_deployed: bool,
) -> VerticalDecision {
    let tol = params.tolerance_coef;
    let landing_height = sample.com_offset;
    let attitude = sample.velocity.retrograde();

    let gear = gear_deployed
        || sample.surface_altitude < landing_height + params.gear_margin * tol;

    if gear && sample.surface_altitude < landing_height + params.touchdown_margin / tol {
        return VerticalDecision::Touchdown(ControlCommand::new(attitude, 0.0, true));
    }

    if sample.vertical_speed > 0.0 {
        // バウンド・上昇中はスロットルを切って継続
        return VerticalDecision::Continue(ControlCommand::new(attitude, 0.0, gear));
    }

    if sample.liquid_fuel < guidance::LIQUID_FUEL_FLOOR {
        if sample.surface_altitude > landing_height + params.fuel_abort_margin * tol {
            return VerticalDecision::FuelAbort(ControlCommand::new(attitude, 0.0, gear));
        }
        // 接地間際の燃料切れは温存したまま降下を続ける
        return VerticalDecision::Continue(ControlCommand::new(attitude, 0.0, gear));
    }

    let throttle = guidance::terminal_descent_throttle(sample, landing_height);
    VerticalDecision::Continue(ControlCommand::new(attitude, throttle, gear))
}

/// 着陸フェーズシーケンサ
///
/// 1機の機体に束縛され、1回の着陸シーケンスの間だけ生存します。
/// 並行して複数機を着陸させる場合は機体ごとに独立したシーケンサを
/// 使用してください（共有可変状態なし）。同一機体への二重束縛は
/// 後勝ちの競合となるため使用条件違反です。
pub struct LandingSequencer<V: ITelemetry + IActuation> {
    vessel: V,
    params: LandingParams,
    cancel: Arc<AtomicBool>,
    name: String,
}

impl<V: ITelemetry + IActuation> LandingSequencer<V> {
    pub fn new(vessel: V, params: LandingParams) -> Self {
        let name = vessel.vessel_name();
        Self {
            vessel,
            params,
            cancel: Arc::new(AtomicBool::new(false)),
            name,
        }
    }

    /// キャンセルハンドルの取得
    ///
    /// ハンドルに`true`を格納すると、各ポーリング境界でシーケンスが
    /// 中断されます。
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// 束縛された機体への参照
    pub fn vessel(&self) -> &V {
        &self.vessel
    }

    /// 着陸シーケンスの実行
    ///
    /// 4フェーズを順に実行し、接地または燃料枯渇中断で終了します。
    /// どの経路で終了しても姿勢保持系は解除されます。
    pub fn run(&mut self) -> Result<LandingOutcome, LandingError> {
        info!(
            vessel = %self.name,
            tolerance_coef = self.params.tolerance_coef,
            "LANDING_SEQUENCE_START: 自動着陸シーケンスを開始します"
        );

        // 初期化: SAS/RCSを切り、スロットル0で姿勢保持系を起動
        self.initialize().map_err(|e| {
            error!(vessel = %self.name, error = %e, "LANDING_INIT_FAILED: 初期化に失敗しました");
            LandingError::Actuation(LandingPhase::Approach, e)
        })?;

        let result = self.run_phases();

        // 終了処理: 結果に関わらず姿勢保持系を解除（ベストエフォート）
        let _ = self.vessel.disengage_autopilot();

        match &result {
            Ok(LandingOutcome::Touchdown) => {
                info!(vessel = %self.name, "LANDING_TOUCHDOWN: 自動着陸が完了しました");
            }
            Ok(LandingOutcome::FuelAbort) => {
                warn!(vessel = %self.name, "LANDING_ABORTED: 着陸シーケンスを中断して終了しました");
            }
            Err(err) => {
                error!(vessel = %self.name, error = %err, "LANDING_FAILED: 着陸シーケンスが失敗しました");
            }
        }

        result
    }

    fn initialize(&mut self) -> Result<(), ActuationError> {
        self.vessel.set_sas(false)?;
        self.vessel.set_rcs(false)?;
        self.vessel.set_throttle(0.0)?;
        self.vessel.engage_autopilot()?;
        Ok(())
    }

    fn run_phases(&mut self) -> Result<LandingOutcome, LandingError> {
        self.run_approach()?;
        self.run_horizontal_deceleration()?;
        self.run_descent_search()?;
        self.run_vertical_descent()
    }

    /// 接近フェーズ
    ///
    /// 逆行姿勢・スロットル0のまま、実効しきい値高度を下回り降下中に
    /// なるまで粗い周期でポーリングします。
    fn run_approach(&mut self) -> Result<(), LandingError> {
        let phase = LandingPhase::Approach;
        debug!(vessel = %self.name, phase = phase.label(), "フェーズ開始");

        for _ in 0..self.params.max_iter_approach {
            self.check_cancel(phase)?;
            let sample = self.poll(phase)?;

            let command = approach_command(&sample);
            self.set_attitude(phase, command.attitude_target)?;

            if approach_exit(&sample, &self.params) {
                info!(
                    vessel = %self.name,
                    previous_phase = phase.label(),
                    current_phase = LandingPhase::HorizontalDeceleration.label(),
                    altitude_m = sample.surface_altitude,
                    vertical_speed_mps = sample.vertical_speed,
                    horizontal_speed_mps = sample.horizontal_speed,
                    "LANDING_PHASE_TRANSITION: 接近フェーズを離脱し、着陸誘導を開始します"
                );
                return Ok(());
            }

            self.pause(self.params.poll_approach);
        }

        Err(self.phase_timeout(phase, self.params.max_iter_approach))
    }

    /// 水平減速フェーズ
    ///
    /// 逆行姿勢を保ちながら水平減速式のスロットルを与え、水平速度が
    /// 離脱しきい値を下回ったらスロットルを0に戻して離脱します。
    fn run_horizontal_deceleration(&mut self) -> Result<(), LandingError> {
        let phase = LandingPhase::HorizontalDeceleration;
        debug!(vessel = %self.name, phase = phase.label(), "フェーズ開始");

        for _ in 0..self.params.max_iter_horizontal {
            self.check_cancel(phase)?;
            let sample = self.poll(phase)?;

            if horizontal_exit(&sample, &self.params) {
                // 離脱時はスロットルを強制的に0へ
                self.set_throttle(phase, 0.0)?;
                info!(
                    vessel = %self.name,
                    previous_phase = phase.label(),
                    current_phase = LandingPhase::DescentSearch.label(),
                    altitude_m = sample.surface_altitude,
                    vertical_speed_mps = sample.vertical_speed,
                    horizontal_speed_mps = sample.horizontal_speed,
                    "LANDING_PHASE_TRANSITION: 水平減速が完了しました"
                );
                return Ok(());
            }

            let command = horizontal_command(&sample);
            self.set_attitude(phase, command.attitude_target)?;
            self.set_throttle(phase, command.throttle)?;

            self.pause(self.params.poll_horizontal);
        }

        Err(self.phase_timeout(phase, self.params.max_iter_horizontal))
    }

    /// 降下開始探索フェーズ
    ///
    /// スロットルには触れず（前フェーズで0に戻し済み）、毎反復で
    /// 降下開始高度を再計算し、高度がそれを下回るまでポーリングします。
    fn run_descent_search(&mut self) -> Result<(), LandingError> {
        let phase = LandingPhase::DescentSearch;
        debug!(vessel = %self.name, phase = phase.label(), "フェーズ開始");

        let mut twr_warned = false;

        for _ in 0..self.params.max_iter_descent_search {
            self.check_cancel(phase)?;
            let sample = self.poll(phase)?;

            self.set_attitude(phase, sample.velocity.retrograde())?;

            let target_height = descent_search_target_height(&sample, &self.params);
            if target_height.is_infinite() && !twr_warned {
                // 推力重量比不足: この状態が続くと反復上限で離脱する
                warn!(
                    vessel = %self.name,
                    available_thrust_n = sample.available_thrust,
                    mass_kg = sample.mass,
                    surface_gravity = sample.surface_gravity,
                    "LANDING_TWR_INSUFFICIENT: 正味上向き加速度がなく降下噴射高度を定義できません"
                );
                twr_warned = true;
            }

            if sample.surface_altitude < target_height {
                info!(
                    vessel = %self.name,
                    previous_phase = phase.label(),
                    current_phase = LandingPhase::VerticalDescent.label(),
                    altitude_m = sample.surface_altitude,
                    vertical_speed_mps = sample.vertical_speed,
                    horizontal_speed_mps = sample.horizontal_speed,
                    target_height_m = target_height,
                    "LANDING_PHASE_TRANSITION: 降下噴射高度に到達、鉛直減速を開始します"
                );
                return Ok(());
            }

            self.pause(self.params.poll_descent_search);
        }

        Err(self.phase_timeout(phase, self.params.max_iter_descent_search))
    }

    /// 鉛直減速・接地フェーズ
    ///
    /// 終端降下スロットルで降下率を制御し、ギア展開余裕でギアを開き、
    /// 接地余裕に入ったらスロットルを切って終了します。燃料枯渇時は
    /// 安全余裕より上なら中断します。
    fn run_vertical_descent(&mut self) -> Result<LandingOutcome, LandingError> {
        let phase = LandingPhase::VerticalDescent;
        debug!(vessel = %self.name, phase = phase.label(), "フェーズ開始");

        let mut gear_deployed = false;

        for _ in 0..self.params.max_iter_vertical {
            self.check_cancel(phase)?;
            let sample = self.poll(phase)?;

            let decision = vertical_step(&sample, &self.params, gear_deployed);

            let command = match decision {
                VerticalDecision::Continue(cmd)
                | VerticalDecision::Touchdown(cmd)
                | VerticalDecision::FuelAbort(cmd) => cmd,
            };

            self.set_attitude(phase, command.attitude_target)?;
            // ギアは単調: 展開への遷移時のみ指示する
            if command.gear_deployed && !gear_deployed {
                self.set_gear(phase)?;
                gear_deployed = true;
                info!(
                    vessel = %self.name,
                    altitude_m = sample.surface_altitude,
                    vertical_speed_mps = sample.vertical_speed,
                    "LANDING_GEAR_DEPLOYED: 着陸ギアを展開しました"
                );
            }
            self.set_throttle(phase, command.throttle)?;

            match decision {
                VerticalDecision::Touchdown(_) => {
                    info!(
                        vessel = %self.name,
                        altitude_m = sample.surface_altitude,
                        vertical_speed_mps = sample.vertical_speed,
                        "LANDING_CONTACT: 接地余裕に入りました"
                    );
                    return Ok(LandingOutcome::Touchdown);
                }
                VerticalDecision::FuelAbort(_) => {
                    warn!(
                        vessel = %self.name,
                        altitude_m = sample.surface_altitude,
                        liquid_fuel = sample.liquid_fuel,
                        "LANDING_FUEL_ABORT: 燃料不足のため着陸を中断します"
                    );
                    return Ok(LandingOutcome::FuelAbort);
                }
                VerticalDecision::Continue(_) => {}
            }

            self.pause(self.params.poll_vertical);
        }

        Err(self.phase_timeout(phase, self.params.max_iter_vertical))
    }

    fn poll(&mut self, phase: LandingPhase) -> Result<TelemetrySample, LandingError> {
        self.vessel.sample().map_err(|e| {
            error!(
                vessel = %self.name,
                phase = phase.label(),
                error = %e,
                "LANDING_TELEMETRY_FAILED: テレメトリ読み出しに失敗しました"
            );
            LandingError::Telemetry(phase, e)
        })
    }

    fn set_attitude(&mut self, phase: LandingPhase, target: Vector3) -> Result<(), LandingError> {
        self.vessel
            .set_attitude_target(target)
            .map_err(|e| LandingError::Actuation(phase, e))
    }

    fn set_throttle(&mut self, phase: LandingPhase, throttle: f64) -> Result<(), LandingError> {
        self.vessel
            .set_throttle(throttle)
            .map_err(|e| LandingError::Actuation(phase, e))
    }

    fn set_gear(&mut self, phase: LandingPhase) -> Result<(), LandingError> {
        self.vessel
            .set_gear(true)
            .map_err(|e| LandingError::Actuation(phase, e))
    }

    fn check_cancel(&mut self, phase: LandingPhase) -> Result<(), LandingError> {
        if self.cancel.load(Ordering::Relaxed) {
            // 中断時はスロットルだけ切っておく（ベストエフォート）
            let _ = self.vessel.set_throttle(0.0);
            info!(
                vessel = %self.name,
                phase = phase.label(),
                "LANDING_CANCELLED: キャンセル信号を受けて中断します"
            );
            return Err(LandingError::Cancelled(phase));
        }
        Ok(())
    }

    fn phase_timeout(&mut self, phase: LandingPhase, iterations: u64) -> LandingError {
        let _ = self.vessel.set_throttle(0.0);
        error!(
            vessel = %self.name,
            phase = phase.label(),
            iterations,
            "LANDING_PHASE_TIMEOUT: フェーズの反復上限を超過しました"
        );
        LandingError::PhaseTimeout { phase, iterations }
    }

    fn pause(&self, period_s: f64) {
        if period_s > 0.0 {
            thread::sleep(Duration::from_secs_f64(period_s));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::MissionConfig;
    use crate::vessel::common::Vector3;
    use crate::vessel::sim::SimVessel;

    /// スリープなしの試験用パラメータ
    fn test_params() -> LandingParams {
        let mut params = LandingParams::from_mission(&MissionConfig::default_mission());
        params.poll_approach = 0.0;
        params.poll_horizontal = 0.0;
        params.poll_descent_search = 0.0;
        params.poll_vertical = 0.0;
        params
    }

    fn sample_at(altitude: f64, vertical_speed: f64, horizontal_speed: f64) -> TelemetrySample {
        TelemetrySample {
            surface_altitude: altitude,
            vertical_speed,
            horizontal_speed,
            velocity: Vector3::new(horizontal_speed, vertical_speed, 0.0),
            surface_gravity: 9.81,
            angle_of_attack: 0.0,
            sideslip_angle: 0.0,
            drag: Vector3::zero(),
            liquid_fuel: 500.0,
            available_thrust: 600_000.0,
            mass: 18_000.0,
            com_offset: 5.0,
        }
    }

    #[test]
    fn test_approach_does_not_exit_above_effective_threshold() {
        // 25000 > 20000 * 1.1 = 22000
        let params = test_params();
        let sample = sample_at(25_000.0, -5.0, 0.0);
        assert!(!approach_exit(&sample, &params));
    }

    #[test]
    fn test_approach_exits_below_effective_threshold() {
        // 20000 < 22000 かつ降下率ゲートを満たす
        let params = test_params();
        let sample = sample_at(20_000.0, -5.0, 0.0);
        assert!(approach_exit(&sample, &params));
    }

    #[test]
    fn test_approach_requires_descent() {
        let params = test_params();
        let sample = sample_at(20_000.0, -0.5, 0.0);
        assert!(!approach_exit(&sample, &params));
    }

    #[test]
    fn test_approach_threshold_widens_with_tolerance() {
        // 許容係数>1では係数1の場合より実効しきい値が厳密に広がる
        let mut tight = test_params();
        tight.tolerance_coef = 1.0;
        let mut wide = test_params();
        wide.tolerance_coef = 1.2;

        let sample = sample_at(22_000.0, -5.0, 0.0);
        assert!(!approach_exit(&sample, &tight));
        assert!(approach_exit(&sample, &wide));
        assert!(
            wide.approach_altitude * wide.tolerance_coef
                > tight.approach_altitude * tight.tolerance_coef
        );
    }

    #[test]
    fn test_approach_command_is_retrograde_coast() {
        let sample = sample_at(25_000.0, -200.0, 50.0);
        let cmd = approach_command(&sample);
        assert_eq!(cmd.throttle, 0.0);
        assert_eq!(cmd.attitude_target, Vector3::new(-50.0, 200.0, 0.0));
    }

    #[test]
    fn test_vertical_step_cuts_throttle_when_ascending() {
        let params = test_params();
        let mut sample = sample_at(500.0, 5.0, 0.0);
        sample.liquid_fuel = 500.0;
        match vertical_step(&sample, &params, false) {
            VerticalDecision::Continue(cmd) => assert_eq!(cmd.throttle, 0.0),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_vertical_step_fuel_abort_above_margin() {
        // 残燃料5・高度が安全余裕(5*1.1)より上 → 中断
        let params = test_params();
        let mut sample = sample_at(5.0 + 20.0, -10.0, 0.0);
        sample.liquid_fuel = 5.0;
        assert!(matches!(
            vertical_step(&sample, &params, false),
            VerticalDecision::FuelAbort(_)
        ));
    }

    #[test]
    fn test_vertical_step_fuel_low_near_ground_continues() {
        // 接地間際の燃料切れは中断せずスロットル0で継続
        let params = test_params();
        let mut sample = sample_at(5.0 + 3.0, -2.0, 0.0);
        sample.liquid_fuel = 5.0;
        match vertical_step(&sample, &params, true) {
            VerticalDecision::Continue(cmd) => {
                assert_eq!(cmd.throttle, 0.0);
                assert!(cmd.gear_deployed);
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_vertical_step_deploys_gear_within_margin() {
        // ギア余裕 300*1.1=330m 内でギア展開
        let params = test_params();
        let sample = sample_at(5.0 + 320.0, -50.0, 0.0);
        match vertical_step(&sample, &params, false) {
            VerticalDecision::Continue(cmd) => assert!(cmd.gear_deployed),
            other => panic!("unexpected decision: {:?}", other),
        }
        // 余裕の外では展開しない
        let sample = sample_at(5.0 + 400.0, -50.0, 0.0);
        match vertical_step(&sample, &params, false) {
            VerticalDecision::Continue(cmd) => assert!(!cmd.gear_deployed),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_vertical_step_gear_is_monotonic() {
        // 一度展開したら余裕の外に出てもfalseに戻らない
        let params = test_params();
        let sample = sample_at(5.0 + 400.0, -50.0, 0.0);
        match vertical_step(&sample, &params, true) {
            VerticalDecision::Continue(cmd) => assert!(cmd.gear_deployed),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_vertical_step_touchdown_within_margin() {
        // 接地余裕 0.2/1.1 内でスロットル0・終了
        let params = test_params();
        let sample = sample_at(5.0 + 0.1, -0.5, 0.0);
        match vertical_step(&sample, &params, true) {
            VerticalDecision::Touchdown(cmd) => assert_eq!(cmd.throttle, 0.0),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_full_landing_sequence_touches_down() {
        // デフォルトミッションの模擬機体で4フェーズ通し実行
        let config = MissionConfig::default_mission();
        let vessel = SimVessel::from_config(&config.vessel, config.sim.dt_s);
        let mut sequencer = LandingSequencer::new(vessel, test_params());

        let outcome = sequencer.run().expect("landing sequence failed");
        assert_eq!(outcome, LandingOutcome::Touchdown);
        assert!(outcome.is_success());

        // 接地余裕内で停止していること
        let vessel = sequencer.vessel();
        let touchdown_ceiling =
            vessel.com_offset + 0.2 / 1.1 + 1.0;
        assert!(
            vessel.altitude <= touchdown_ceiling,
            "altitude {} above touchdown ceiling {}",
            vessel.altitude,
            touchdown_ceiling
        );

        // ギア指示は単調（trueの後にfalseが現れない）
        let history = vessel.gear_history();
        assert!(history.contains(&true));
        let first_true = history.iter().position(|g| *g).unwrap();
        assert!(history[first_true..].iter().all(|g| *g));
    }

    #[test]
    fn test_fuel_abort_reports_failure_not_touchdown() {
        // 残燃料5・着陸高さ+10mから開始 → 中断報告
        let config = MissionConfig::default_mission();
        let mut vessel_config = config.vessel.clone();
        vessel_config.initial_altitude_m = vessel_config.com_offset_m + 10.0;
        vessel_config.initial_vertical_speed_mps = -50.0;
        vessel_config.initial_horizontal_speed_mps = 0.0;
        vessel_config.liquid_fuel = 5.0;

        // 短距離シナリオのため積分刻みを細かくする
        let vessel = SimVessel::from_config(&vessel_config, 0.01);
        let mut sequencer = LandingSequencer::new(vessel, test_params());

        let outcome = sequencer.run().expect("sequence errored");
        assert_eq!(outcome, LandingOutcome::FuelAbort);
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_telemetry_failure_is_fatal_for_sequence() {
        let config = MissionConfig::default_mission();
        let mut vessel = SimVessel::from_config(&config.vessel, config.sim.dt_s);
        vessel.fail_telemetry_after(3);
        let mut sequencer = LandingSequencer::new(vessel, test_params());

        match sequencer.run() {
            Err(LandingError::Telemetry(phase, _)) => {
                assert_eq!(phase, LandingPhase::Approach);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cancellation_interrupts_at_poll_boundary() {
        let config = MissionConfig::default_mission();
        let vessel = SimVessel::from_config(&config.vessel, config.sim.dt_s);
        let mut sequencer = LandingSequencer::new(vessel, test_params());

        sequencer.cancel_handle().store(true, Ordering::Relaxed);
        assert!(matches!(
            sequencer.run(),
            Err(LandingError::Cancelled(LandingPhase::Approach))
        ));
    }

    #[test]
    fn test_stalled_telemetry_hits_iteration_limit() {
        // 高高度で静止に近い機体は接近フェーズを離脱できず上限で離脱
        let config = MissionConfig::default_mission();
        let mut vessel_config = config.vessel.clone();
        vessel_config.initial_altitude_m = 50_000.0;
        vessel_config.initial_vertical_speed_mps = -0.1;
        vessel_config.initial_horizontal_speed_mps = 0.0;

        let vessel = SimVessel::from_config(&vessel_config, 0.0001);
        let mut params = test_params();
        params.max_iter_approach = 10;
        let mut sequencer = LandingSequencer::new(vessel, params);

        assert!(matches!(
            sequencer.run(),
            Err(LandingError::PhaseTimeout { phase: LandingPhase::Approach, iterations: 10 })
        ));
    }
}
