//! # SimVessel モジュール
//!
//! 外部の遠隔テレメトリ/コマンド伝送路の代替となる模擬機体を提供します。
//!
//! 実運用ではテレメトリ源・アクチュエーション先は遠隔のフライト
//! シミュレーションですが、本クレートは伝送路を外部協調者として扱うため、
//! 単純な質点運動の模擬機体で両インターフェースを実装します。
//! これにより着陸シーケンス全体をプロセス内で通し実行できます。
//!
//! ## 運動モデル
//!
//! - 推力と抗力は速度ベクトルの逆方向（姿勢保持系が逆行姿勢を維持する前提）
//! - 重力は鉛直下向きに一定
//! - 燃料はスロットルに比例して消費され、質量が減少
//! - テレメトリ取得のたびに固定刻みΔtで1ステップ積分（ポーリングと同期）

use crate::mission::VesselConfig;
use crate::vessel::common::{TelemetrySample, Vector3};
use crate::vessel::traits::{ActuationError, IActuation, ITelemetry, TelemetryError};

/// 模擬機体
///
/// `ITelemetry`と`IActuation`の両方を実装し、1機の着陸シーケンスに
/// 占有されることを前提とします（共有状態なし）。
#[derive(Debug, Clone)]
pub struct SimVessel {
    pub name: String,

    /// 地表からの高度（m、機体原点基準）
    pub altitude: f64,
    /// 鉛直速度（m/s、負が降下）
    pub vertical_speed: f64,
    /// 水平速度（m/s、0以上）
    pub horizontal_speed: f64,
    /// 残存液体燃料（単位量）
    pub liquid_fuel: f64,

    /// 乾燥質量（kg）
    pub dry_mass: f64,
    /// 燃料1単位あたりの質量（kg）
    pub fuel_unit_mass: f64,
    /// 全開時の燃料消費率（単位量/s）
    pub fuel_burn_rate: f64,
    /// 最大推力（N）
    pub max_thrust: f64,
    /// 表面重力加速度（m/s²）
    pub surface_gravity: f64,
    /// 着陸高さ補正（m）
    pub com_offset: f64,
    /// 抗力係数（N·s²/m²）
    pub drag_coef: f64,
    /// 積分刻み（s）
    pub dt: f64,

    // アクチュエーション状態（last-write-wins）
    throttle: f64,
    attitude_target: Vector3,
    gear: bool,
    sas: bool,
    rcs: bool,
    autopilot_engaged: bool,

    /// ギア指示の履歴（単調性検証用）
    gear_history: Vec<bool>,
    /// 経過時間（s）
    elapsed: f64,
    /// 指定サンプル数経過後にテレメトリ断を模擬（伝送路障害試験用）
    telemetry_failure_after: Option<u64>,
    sample_count: u64,
    landed: bool,
}

impl SimVessel {
    /// ミッション設定から模擬機体を作成
    pub fn from_config(config: &VesselConfig, dt: f64) -> Self {
        Self::new(config.name.clone(), config, dt)
    }

    /// 名前を指定して模擬機体を作成（分離機体用）
    pub fn new(name: String, config: &VesselConfig, dt: f64) -> Self {
        Self {
            name,
            altitude: config.initial_altitude_m,
            vertical_speed: config.initial_vertical_speed_mps,
            horizontal_speed: config.initial_horizontal_speed_mps,
            liquid_fuel: config.liquid_fuel,
            dry_mass: config.dry_mass_kg,
            fuel_unit_mass: config.fuel_unit_mass_kg,
            fuel_burn_rate: config.fuel_burn_rate,
            max_thrust: config.max_thrust_n,
            surface_gravity: config.surface_gravity_mps2,
            com_offset: config.com_offset_m,
            drag_coef: config.drag_coef,
            dt,
            throttle: 0.0,
            attitude_target: Vector3::zero(),
            gear: false,
            sas: false,
            rcs: false,
            autopilot_engaged: false,
            gear_history: Vec::new(),
            elapsed: 0.0,
            telemetry_failure_after: None,
            sample_count: 0,
            landed: false,
        }
    }

    /// 指定サンプル数の後にテレメトリ断を発生させる（試験用）
    pub fn fail_telemetry_after(&mut self, samples: u64) {
        self.telemetry_failure_after = Some(samples);
    }

    /// ギア指示履歴への参照（単調性検証用）
    pub fn gear_history(&self) -> &[bool] {
        &self.gear_history
    }

    /// 接地済みかどうか
    pub fn is_landed(&self) -> bool {
        self.landed
    }

    /// 経過時間（s）
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// 現在の機体質量（kg）
    pub fn mass(&self) -> f64 {
        self.dry_mass + self.liquid_fuel * self.fuel_unit_mass
    }

    /// 利用可能推力（N）
    ///
    /// 燃料が尽きた時点で0になります。
    pub fn available_thrust(&self) -> f64 {
        if self.liquid_fuel > 0.0 {
            self.max_thrust
        } else {
            0.0
        }
    }

    /// 抗力の大きさ（N）
    fn drag_magnitude(&self) -> f64 {
        let speed = (self.vertical_speed.powi(2) + self.horizontal_speed.powi(2)).sqrt();
        self.drag_coef * speed.powi(2)
    }

    /// 固定刻みで1ステップ積分
    ///
    /// 推力・抗力を速度逆方向へ、重力を鉛直下向きへ適用し、
    /// 速度・高度・燃料・質量を更新します。接地後は状態を固定します。
    fn step(&mut self) {
        if self.landed {
            self.elapsed += self.dt;
            return;
        }

        let mass = self.mass();
        let thrust = self.throttle * self.available_thrust();
        let speed = (self.vertical_speed.powi(2) + self.horizontal_speed.powi(2)).sqrt();

        // 推力と抗力は逆行方向（姿勢保持系が逆行姿勢を維持している前提）
        let retro_accel = (thrust + self.drag_magnitude()) / mass;
        if speed > 1e-9 {
            self.vertical_speed += retro_accel * (-self.vertical_speed / speed) * self.dt;
            self.horizontal_speed += retro_accel * (-self.horizontal_speed / speed) * self.dt;
        } else {
            // 速度ゼロ近傍では推力を上向きに適用
            self.vertical_speed += (thrust / mass) * self.dt;
        }

        // 水平速度は符号を持たない（減速の行き過ぎは0に丸める）
        if self.horizontal_speed < 0.0 {
            self.horizontal_speed = 0.0;
        }

        // 重力
        self.vertical_speed -= self.surface_gravity * self.dt;

        // 高度更新
        self.altitude += self.vertical_speed * self.dt;

        // 燃料消費
        if thrust > 0.0 {
            self.liquid_fuel = (self.liquid_fuel - self.throttle * self.fuel_burn_rate * self.dt).max(0.0);
        }

        // 接地判定（機体原点が着陸高さに達した時点で静止）
        if self.altitude <= self.com_offset {
            self.altitude = self.com_offset;
            self.vertical_speed = 0.0;
            self.horizontal_speed = 0.0;
            self.landed = true;
        }

        self.elapsed += self.dt;
    }
}

impl ITelemetry for SimVessel {
    fn sample(&mut self) -> Result<TelemetrySample, TelemetryError> {
        if let Some(limit) = self.telemetry_failure_after {
            if self.sample_count >= limit {
                return Err(TelemetryError::ConnectionLost(format!(
                    "{}: 模擬テレメトリ断 ({}サンプル経過)",
                    self.name, limit
                )));
            }
        }
        self.sample_count += 1;

        // ポーリングと同期して物理を1ステップ進める
        self.step();

        let speed = (self.vertical_speed.powi(2) + self.horizontal_speed.powi(2)).sqrt();
        let velocity = Vector3::new(self.horizontal_speed, self.vertical_speed, 0.0);
        let drag = if speed > 1e-9 {
            velocity.normalize() * (-self.drag_magnitude())
        } else {
            Vector3::zero()
        };

        let sample = TelemetrySample {
            surface_altitude: self.altitude,
            vertical_speed: self.vertical_speed,
            horizontal_speed: self.horizontal_speed,
            velocity,
            surface_gravity: self.surface_gravity,
            // 姿勢保持系が逆行姿勢を維持する前提で迎え角・横滑り角は0
            angle_of_attack: 0.0,
            sideslip_angle: 0.0,
            drag,
            liquid_fuel: self.liquid_fuel,
            available_thrust: self.available_thrust(),
            mass: self.mass(),
            com_offset: self.com_offset,
        };

        if !sample.surface_altitude.is_finite() || !sample.vertical_speed.is_finite() {
            return Err(TelemetryError::InvalidReading(format!(
                "{}: 高度または速度が非有限値",
                self.name
            )));
        }

        Ok(sample)
    }

    fn vessel_name(&self) -> String {
        self.name.clone()
    }
}

impl IActuation for SimVessel {
    fn set_attitude_target(&mut self, target: Vector3) -> Result<(), ActuationError> {
        self.attitude_target = target;
        Ok(())
    }

    fn set_throttle(&mut self, throttle: f64) -> Result<(), ActuationError> {
        self.throttle = throttle.clamp(0.0, 1.0);
        Ok(())
    }

    fn set_gear(&mut self, deployed: bool) -> Result<(), ActuationError> {
        self.gear = deployed;
        self.gear_history.push(deployed);
        Ok(())
    }

    fn set_sas(&mut self, enabled: bool) -> Result<(), ActuationError> {
        self.sas = enabled;
        Ok(())
    }

    fn set_rcs(&mut self, enabled: bool) -> Result<(), ActuationError> {
        self.rcs = enabled;
        Ok(())
    }

    fn engage_autopilot(&mut self) -> Result<(), ActuationError> {
        self.autopilot_engaged = true;
        Ok(())
    }

    fn disengage_autopilot(&mut self) -> Result<(), ActuationError> {
        self.autopilot_engaged = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::MissionConfig;

    fn test_vessel() -> SimVessel {
        let config = MissionConfig::default_mission();
        SimVessel::from_config(&config.vessel, 0.1)
    }

    #[test]
    fn test_free_fall_accelerates_descent() {
        let mut vessel = test_vessel();
        vessel.horizontal_speed = 0.0;
        vessel.drag_coef = 0.0;
        let vs0 = vessel.vertical_speed;
        let _ = vessel.sample().unwrap();
        assert!(vessel.vertical_speed < vs0);
    }

    #[test]
    fn test_full_throttle_brakes_descent() {
        let mut vessel = test_vessel();
        vessel.horizontal_speed = 0.0;
        vessel.set_throttle(1.0).unwrap();
        let vs0 = vessel.vertical_speed;
        let _ = vessel.sample().unwrap();
        // 推力重量比>1なので重力に逆らって降下率が減る
        assert!(vessel.vertical_speed > vs0);
    }

    #[test]
    fn test_fuel_exhaustion_kills_thrust() {
        let mut vessel = test_vessel();
        vessel.liquid_fuel = 0.0;
        assert_eq!(vessel.available_thrust(), 0.0);
    }

    #[test]
    fn test_throttle_burns_fuel() {
        let mut vessel = test_vessel();
        let fuel0 = vessel.liquid_fuel;
        vessel.set_throttle(1.0).unwrap();
        let _ = vessel.sample().unwrap();
        assert!(vessel.liquid_fuel < fuel0);
    }

    #[test]
    fn test_ground_contact_freezes_state() {
        let mut vessel = test_vessel();
        vessel.altitude = vessel.com_offset + 0.01;
        vessel.vertical_speed = -1.0;
        vessel.horizontal_speed = 0.0;
        let _ = vessel.sample().unwrap();
        assert!(vessel.is_landed());
        assert_eq!(vessel.vertical_speed, 0.0);
        assert_eq!(vessel.altitude, vessel.com_offset);
    }

    #[test]
    fn test_telemetry_failure_injection() {
        let mut vessel = test_vessel();
        vessel.fail_telemetry_after(2);
        assert!(vessel.sample().is_ok());
        assert!(vessel.sample().is_ok());
        assert!(vessel.sample().is_err());
    }
}
