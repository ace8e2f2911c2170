use std::ops::{Add, Sub, Mul, Neg};

/// 3次元ベクトルを表す構造体
///
/// 速度ベクトル・抗力ベクトル・姿勢目標ベクトルの表現に共通で使用します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// ベクトルの大きさ
    pub fn magnitude(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2) + self.z.powi(2)).sqrt()
    }

    /// ベクトルを正規化
    pub fn normalize(&self) -> Self {
        let mag = self.magnitude();
        if mag > 0.0 {
            Self::new(self.x / mag, self.y / mag, self.z / mag)
        } else {
            *self
        }
    }

    /// 現在の速度ベクトルに対する逆行方向（レトログレード）
    ///
    /// 全フェーズ共通の姿勢保持則で使用します。速度と真逆のベクトルを
    /// 姿勢目標として与えることで、制動効率が最大となる向きを近似します。
    pub fn retrograde(&self) -> Self {
        -*self
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// テレメトリサンプル
///
/// 1回のポーリングで取得する機体状態の瞬時スナップショットです。
/// 全フィールドは同一時刻の整合した値であり、制御ループは取得時点の値を
/// 正とみなして毎周期読み直します（周期間のキャッシュはしません）。
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySample {
    /// 地表からの高度（m、名目上0以上）
    pub surface_altitude: f64,
    /// 鉛直速度（m/s、負が降下）
    pub vertical_speed: f64,
    /// 水平速度（m/s、0以上）
    pub horizontal_speed: f64,
    /// 速度ベクトル（m/s）
    pub velocity: Vector3,
    /// 天体表面の重力加速度（m/s²、正）
    pub surface_gravity: f64,
    /// 迎え角（度）
    pub angle_of_attack: f64,
    /// 横滑り角（度）
    pub sideslip_angle: f64,
    /// 抗力ベクトル（N）
    pub drag: Vector3,
    /// 残存液体燃料（単位量、0以上）
    pub liquid_fuel: f64,
    /// 利用可能推力（N、0以上）
    pub available_thrust: f64,
    /// 機体質量（kg、正）
    pub mass: f64,
    /// 最下部エンジンのバウンディングボックスから機体原点までの距離（m）
    ///
    /// 地表高度と機体原点高度のずれを補正する着陸高さとして使用します。
    pub com_offset: f64,
}

/// 制御コマンド
///
/// 1ループ反復ごとに生成され、即座にアクチュエーション側へ書き込まれます。
/// スロットルは[0,1]にクランプ済みの値を保持します。
#[derive(Debug, Clone, Copy)]
pub struct ControlCommand {
    /// 姿勢目標ベクトル（逆行方向）
    pub attitude_target: Vector3,
    /// スロットル [0,1]
    pub throttle: f64,
    /// ギア展開フラグ（単調: 一度trueになったら以後falseに戻さない）
    pub gear_deployed: bool,
}

impl ControlCommand {
    /// スロットルを[0,1]にクランプしてコマンドを作成
    pub fn new(attitude_target: Vector3, throttle: f64, gear_deployed: bool) -> Self {
        Self {
            attitude_target,
            throttle: throttle.clamp(0.0, 1.0),
            gear_deployed,
        }
    }

    /// スロットル0・ギア指示なしの逆行姿勢コマンド
    pub fn coast(velocity: &Vector3) -> Self {
        Self::new(velocity.retrograde(), 0.0, false)
    }
}

/// 着陸フェーズを表す列挙型
///
/// 4フェーズは厳密にこの順で1回ずつ実行され、スキップも再突入もしません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingPhase {
    /// 接近（高高度・粗いポーリング）
    Approach,
    /// 水平減速
    HorizontalDeceleration,
    /// 降下開始高度の探索
    DescentSearch,
    /// 鉛直減速・接地（最終フェーズ・最密ポーリング）
    VerticalDescent,
}

impl LandingPhase {
    /// ログ用のフェーズ名
    pub fn label(&self) -> &'static str {
        match self {
            LandingPhase::Approach => "approach",
            LandingPhase::HorizontalDeceleration => "horizontal_deceleration",
            LandingPhase::DescentSearch => "descent_search",
            LandingPhase::VerticalDescent => "vertical_descent",
        }
    }
}

/// 着陸シーケンスの終了結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingOutcome {
    /// 接地完了（正常終了）
    Touchdown,
    /// 燃料枯渇による中断（安全高度より上でスロットルを切って離脱）
    FuelAbort,
}

impl LandingOutcome {
    /// 着陸が成功したかどうか
    pub fn is_success(&self) -> bool {
        *self == LandingOutcome::Touchdown
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 度をラジアンに変換
    pub fn deg_to_rad(degrees: f64) -> f64 {
        degrees * std::f64::consts::PI / 180.0
    }

    /// ラジアンを度に変換
    pub fn rad_to_deg(radians: f64) -> f64 {
        radians * 180.0 / std::f64::consts::PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrograde_is_negated_velocity() {
        let vel = Vector3::new(10.0, -20.0, 5.0);
        let retro = vel.retrograde();
        assert_eq!(retro, Vector3::new(-10.0, 20.0, -5.0));
    }

    #[test]
    fn test_command_clamps_throttle() {
        let cmd = ControlCommand::new(Vector3::zero(), 1.7, false);
        assert_eq!(cmd.throttle, 1.0);
        let cmd = ControlCommand::new(Vector3::zero(), -0.3, false);
        assert_eq!(cmd.throttle, 0.0);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let zero = Vector3::zero();
        assert_eq!(zero.normalize(), zero);
    }
}
