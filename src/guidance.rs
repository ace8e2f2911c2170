//! # Guidance モジュール
//!
//! 着陸誘導則（スロットル算出式）を提供します。
//!
//! このモジュールは、瞬時テレメトリから各フェーズのスロットル値を導出する
//! 3つの物理式を純関数として実装します。いずれの式も生の計算結果が[0,1]の
//! 範囲を外れ得るため、出力は必ずクランプされます。
//!
//! ## 誘導式
//!
//! 1. **水平減速スロットル**: 水平速度の平方根に基づく減速量
//! 2. **降下開始高度**: 現在の降下運動エネルギーと正味減速能力から導出される
//!    制動噴射の開始高度
//! 3. **終端降下スロットル**: 重力補償＋残存鉛直運動エネルギー÷残り高度を
//!    姿勢効率で正規化し、抗力分を差し引いた値
//!
//! ## 数値ガード
//!
//! ゼロ近傍の速度・高度差による除算、推力重量比不足、燃料枯渇は全て
//! 防御的にガードし、算術フォールトを外に伝播させません。

use crate::vessel::common::{math_utils, TelemetrySample};

/// 水平減速式の速度オフセット（m/sの平方根スケール）
///
/// 水平速度9 m/sでスロットルがちょうど0となるように決まる定数です。
pub const BLEEDOFF_OFFSET: f64 = 3.0;

/// 燃料枯渇とみなす残量の下限（単位量）
pub const LIQUID_FUEL_FLOOR: f64 = 10.0;

/// 終端降下式で除算を許容する最小高度差（m）
const MIN_ALTITUDE_MARGIN: f64 = 1e-6;

/// 姿勢効率の下限（これ未満は推力が進行方向にほぼ寄与しない）
const MIN_ATTITUDE_EFFICIENCY: f64 = 1e-6;

/// スロットル値を[0,1]にクランプ
pub fn clamp_throttle(raw: f64) -> f64 {
    raw.clamp(0.0, 1.0)
}

/// 水平減速スロットルの計算
///
/// `(sqrt(horizontal_speed) - 3) / sqrt(horizontal_speed)` を[0,1]に
/// クランプした値を返します。水平速度が大きいほど1に漸近し、9 m/s未満で
/// 0に落ちます。
///
/// # 引数
///
/// * `horizontal_speed` - 水平速度（m/s）
///
/// # 戻り値
///
/// クランプ済みスロットル値。水平速度が0以下の場合はゼロ除算を避けて0
pub fn horizontal_braking_throttle(horizontal_speed: f64) -> f64 {
    if horizontal_speed <= 0.0 {
        return 0.0;
    }
    let sqrt_speed = horizontal_speed.sqrt();
    clamp_throttle((sqrt_speed - BLEEDOFF_OFFSET) / sqrt_speed)
}

/// 降下開始高度（制動噴射開始高度）の計算
///
/// 現在の降下速度をちょうど地表で0にするために制動を開始すべき高度を、
/// 降下運動エネルギーと正味上向き加速度能力から導出します。
/// 許容係数は高度側に乗じられ、係数が大きいほど早め（高め）の開始と
/// なります。
///
/// `target_height = vs² * tolerance / (2 * (thrust/mass - g)) + com_offset`
///
/// # 引数
///
/// * `vertical_speed` - 鉛直速度（m/s、負が降下）
/// * `tolerance_coef` - 許容係数
/// * `available_thrust` - 利用可能推力（N）
/// * `mass` - 機体質量（kg）
/// * `surface_gravity` - 表面重力加速度（m/s²）
/// * `com_offset` - 着陸高さ補正（m）
///
/// # 戻り値
///
/// 降下開始高度（m）。正味加速度が非正（推力重量比不足）の場合は
/// 減速不能のため無限大を返し、「降下噴射を開始しない」扱いとします
pub fn burn_start_altitude(
    vertical_speed: f64,
    tolerance_coef: f64,
    available_thrust: f64,
    mass: f64,
    surface_gravity: f64,
    com_offset: f64,
) -> f64 {
    let net_acceleration = available_thrust / mass - surface_gravity;
    if net_acceleration <= 0.0 {
        // 推力が自重に届かない場合はこの式では減速できない
        return f64::INFINITY;
    }
    vertical_speed.powi(2) * tolerance_coef / (2.0 * net_acceleration) + com_offset
}

/// 終端降下スロットルの計算
///
/// 重力補償分と「残存鉛直運動エネルギー÷残り高度」の和を要求加速度とし、
/// 姿勢効率（迎え角と横滑り角の余弦積）で正規化した上で抗力の大きさを
/// 差し引き、利用可能推力で割った値を返します。
///
/// 以下の特例がこの式自体を迂回します:
///
/// - 鉛直速度が正（バウンド・上昇中）→ スロットル0
/// - 残存燃料が下限未満 → スロットル0（燃料温存）
///
/// # 引数
///
/// * `sample` - 現在のテレメトリサンプル
/// * `landing_height` - 着陸高さ（接地とみなす地表高度、通常com_offset）
///
/// # 戻り値
///
/// クランプ済みスロットル値。残り高度が非正またはゼロ近傍の場合は、
/// 降下率が残っている状態での高度余裕消失を意味するため最大制動（1.0）
pub fn terminal_descent_throttle(sample: &TelemetrySample, landing_height: f64) -> f64 {
    if sample.vertical_speed > 0.0 {
        return 0.0;
    }
    if sample.liquid_fuel < LIQUID_FUEL_FLOOR {
        return 0.0;
    }
    if sample.available_thrust <= 0.0 {
        // 推力が無ければ何を指示しても制動できない
        return 0.0;
    }

    let altitude_margin = sample.surface_altitude - landing_height;
    if altitude_margin <= MIN_ALTITUDE_MARGIN {
        return 1.0;
    }

    // 姿勢効率: 迎え角・横滑り角の分だけ推力の進行方向成分が減る
    let attitude_efficiency = math_utils::deg_to_rad(sample.angle_of_attack).cos()
        * math_utils::deg_to_rad(sample.sideslip_angle).cos();
    if attitude_efficiency.abs() < MIN_ATTITUDE_EFFICIENCY {
        return 1.0;
    }

    let required_acceleration =
        sample.vertical_speed.powi(2) / (2.0 * altitude_margin) + sample.surface_gravity;
    let raw = ((sample.mass / attitude_efficiency) * required_acceleration
        - sample.drag.magnitude())
        / sample.available_thrust;

    clamp_throttle(raw)
}
