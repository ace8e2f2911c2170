use serde::{Deserialize, Serialize};
use std::path::Path;
use std::fs;

/// ミッションメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MissionMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// シミュレーション設定
///
/// 模擬機体（テレメトリ源の代替）の物理積分刻みです。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    pub dt_s: f64,
}

/// 着陸誘導設定
///
/// 全フェーズの遷移しきい値を定義します。許容係数は全しきい値比較に
/// 一律に乗じられ、シーケンス開始後は変更されません。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LandingConfig {
    /// 許容係数（>1で早め・安全側の遷移、<1で遅め）
    pub tolerance_coef: f64,
    /// 接近フェーズの離脱高度（m）
    pub approach_altitude_m: f64,
    /// 接近フェーズ離脱に要求する降下率の上限（m/s、負値）
    pub approach_descent_gate_mps: f64,
    /// 水平減速フェーズの離脱水平速度（m/s）
    pub horizontal_exit_mps: f64,
    /// ギア展開を指示する着陸高さ上の余裕（m、許容係数が乗じられる）
    pub gear_margin_m: f64,
    /// 接地とみなす着陸高さ上の余裕（m、許容係数で除算される）
    pub touchdown_margin_m: f64,
    /// 燃料枯渇中断を発動する着陸高さ上の余裕（m、許容係数が乗じられる）
    pub fuel_abort_margin_m: f64,
}

/// フェーズ別ポーリング周期設定
///
/// 接地に近づくほど必要な制御権限が増すため、周期は後段ほど短くします。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    pub approach_s: f64,
    pub horizontal_s: f64,
    pub descent_search_s: f64,
    pub vertical_s: f64,
}

/// フェーズ別最大反復回数設定
///
/// テレメトリが停滞した場合の無期限ブロックを防ぐ上限です。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    pub approach_max_iter: u64,
    pub horizontal_max_iter: u64,
    pub descent_search_max_iter: u64,
    pub vertical_max_iter: u64,
}

/// 編隊（分離着陸）設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetConfig {
    /// 切り離して同時着陸させる機体数
    pub decoupler_count: u32,
}

/// 模擬機体の初期状態設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VesselConfig {
    pub name: String,
    pub initial_altitude_m: f64,
    pub initial_vertical_speed_mps: f64,
    pub initial_horizontal_speed_mps: f64,
    pub dry_mass_kg: f64,
    pub liquid_fuel: f64,
    pub fuel_unit_mass_kg: f64,
    pub fuel_burn_rate: f64,
    pub max_thrust_n: f64,
    pub surface_gravity_mps2: f64,
    pub com_offset_m: f64,
    pub drag_coef: f64,
}

/// 完全なミッション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MissionConfig {
    pub meta: MissionMeta,
    pub sim: SimConfig,
    pub landing: LandingConfig,
    pub polling: PollingConfig,
    pub limits: LimitsConfig,
    pub fleet: FleetConfig,
    pub vessel: VesselConfig,
}

impl MissionConfig {
    /// YAMLファイルからミッション設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MissionError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(MissionError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents = fs::read_to_string(path)
            .map_err(|e| MissionError::IoError(path.to_path_buf(), e))?;

        // YAML解析
        let config: MissionConfig = serde_yaml::from_str(&contents)
            .map_err(|e| MissionError::ParseError(path.to_path_buf(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// テストモード用のデフォルトミッション
    ///
    /// 高度24km・降下率-250m/sから単機を着陸させる標準構成です。
    pub fn default_mission() -> Self {
        Self {
            meta: MissionMeta {
                version: "1.0".to_string(),
                name: "default".to_string(),
                description: "デフォルト単機着陸ミッション".to_string(),
            },
            sim: SimConfig { dt_s: 0.1 },
            landing: LandingConfig {
                tolerance_coef: 1.1,
                approach_altitude_m: 20_000.0,
                approach_descent_gate_mps: -1.0,
                horizontal_exit_mps: 10.0,
                gear_margin_m: 300.0,
                touchdown_margin_m: 0.2,
                fuel_abort_margin_m: 5.0,
            },
            polling: PollingConfig {
                approach_s: 1.0,
                horizontal_s: 0.1,
                descent_search_s: 0.2,
                vertical_s: 0.01,
            },
            limits: LimitsConfig {
                approach_max_iter: 100_000,
                horizontal_max_iter: 100_000,
                descent_search_max_iter: 100_000,
                vertical_max_iter: 1_000_000,
            },
            fleet: FleetConfig { decoupler_count: 1 },
            vessel: VesselConfig {
                name: "AutoLanding".to_string(),
                initial_altitude_m: 24_000.0,
                initial_vertical_speed_mps: -250.0,
                initial_horizontal_speed_mps: 60.0,
                dry_mass_kg: 8_000.0,
                liquid_fuel: 2_000.0,
                fuel_unit_mass_kg: 5.0,
                fuel_burn_rate: 4.0,
                max_thrust_n: 600_000.0,
                surface_gravity_mps2: 9.81,
                com_offset_m: 5.0,
                drag_coef: 1.2,
            },
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), MissionError> {
        // 時間設定の検証
        if self.sim.dt_s <= 0.0 {
            return Err(MissionError::ValidationError("dt_s must be positive".to_string()));
        }

        // 着陸設定の検証
        if self.landing.tolerance_coef <= 0.0 {
            return Err(MissionError::ValidationError(
                "tolerance_coef must be positive".to_string(),
            ));
        }
        if self.landing.approach_altitude_m <= 0.0 {
            return Err(MissionError::ValidationError(
                "approach_altitude_m must be positive".to_string(),
            ));
        }
        if self.landing.approach_descent_gate_mps >= 0.0 {
            return Err(MissionError::ValidationError(
                "approach_descent_gate_mps must be negative".to_string(),
            ));
        }
        if self.landing.horizontal_exit_mps <= 0.0 {
            return Err(MissionError::ValidationError(
                "horizontal_exit_mps must be positive".to_string(),
            ));
        }
        if self.landing.touchdown_margin_m <= 0.0
            || self.landing.gear_margin_m <= self.landing.touchdown_margin_m
        {
            return Err(MissionError::ValidationError(
                "gear_margin_m must exceed touchdown_margin_m (both positive)".to_string(),
            ));
        }

        // ポーリング周期の検証（0は模擬実行時の無スリープとして許容）
        for (name, period) in [
            ("approach_s", self.polling.approach_s),
            ("horizontal_s", self.polling.horizontal_s),
            ("descent_search_s", self.polling.descent_search_s),
            ("vertical_s", self.polling.vertical_s),
        ] {
            if period < 0.0 {
                return Err(MissionError::ValidationError(
                    format!("{} must not be negative", name),
                ));
            }
        }

        // 反復上限の検証
        for (name, limit) in [
            ("approach_max_iter", self.limits.approach_max_iter),
            ("horizontal_max_iter", self.limits.horizontal_max_iter),
            ("descent_search_max_iter", self.limits.descent_search_max_iter),
            ("vertical_max_iter", self.limits.vertical_max_iter),
        ] {
            if limit == 0 {
                return Err(MissionError::ValidationError(
                    format!("{} must be positive", name),
                ));
            }
        }

        // 編隊設定の検証
        if self.fleet.decoupler_count == 0 {
            return Err(MissionError::ValidationError(
                "decoupler_count must be positive".to_string(),
            ));
        }

        // 機体設定の検証
        if self.vessel.dry_mass_kg <= 0.0 || self.vessel.max_thrust_n <= 0.0 {
            return Err(MissionError::ValidationError(
                "vessel mass and thrust must be positive".to_string(),
            ));
        }
        if self.vessel.surface_gravity_mps2 <= 0.0 {
            return Err(MissionError::ValidationError(
                "surface_gravity_mps2 must be positive".to_string(),
            ));
        }
        if self.vessel.initial_altitude_m <= self.vessel.com_offset_m {
            return Err(MissionError::ValidationError(
                "initial_altitude_m must exceed com_offset_m".to_string(),
            ));
        }

        Ok(())
    }

    /// ミッションの概要を表示
    pub fn print_summary(&self) {
        println!("=== ミッション情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 着陸誘導設定 ===");
        println!("許容係数: {:.4}", self.landing.tolerance_coef);
        println!("接近離脱高度: {:.0}m (実効 {:.0}m)",
                 self.landing.approach_altitude_m,
                 self.landing.approach_altitude_m * self.landing.tolerance_coef);
        println!("水平減速離脱速度: {:.1}m/s", self.landing.horizontal_exit_mps);
        println!("ギア展開余裕: {:.0}m", self.landing.gear_margin_m);
        println!("接地判定余裕: {:.2}m", self.landing.touchdown_margin_m);
        println!();

        println!("=== ポーリング周期 ===");
        println!("接近: {:.2}秒", self.polling.approach_s);
        println!("水平減速: {:.2}秒", self.polling.horizontal_s);
        println!("降下開始探索: {:.2}秒", self.polling.descent_search_s);
        println!("鉛直減速: {:.3}秒", self.polling.vertical_s);
        println!();

        println!("=== 機体 ===");
        println!("名前: {}", self.vessel.name);
        println!("初期高度: {:.0}m", self.vessel.initial_altitude_m);
        println!("初期鉛直速度: {:.1}m/s", self.vessel.initial_vertical_speed_mps);
        println!("初期水平速度: {:.1}m/s", self.vessel.initial_horizontal_speed_mps);
        println!("最大推力: {:.0}N", self.vessel.max_thrust_n);
        println!("同時着陸機数: {}機", self.fleet.decoupler_count);
    }
}

/// ミッション設定読み込みエラー
#[derive(Debug)]
pub enum MissionError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for MissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionError::FileNotFound(path) => {
                write!(f, "ミッションファイルが見つかりません: {}", path.display())
            }
            MissionError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            MissionError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            MissionError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for MissionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mission_is_valid() {
        assert!(MissionConfig::default_mission().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nonpositive_tolerance() {
        let mut config = MissionConfig::default_mission();
        config.landing.tolerance_coef = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_gear_margin_below_touchdown_margin() {
        let mut config = MissionConfig::default_mission();
        config.landing.gear_margin_m = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_iteration_limit() {
        let mut config = MissionConfig::default_mission();
        config.limits.vertical_max_iter = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_distinguishable() {
        let err = MissionConfig::from_file("missions/no_such_mission.yaml").unwrap_err();
        assert!(matches!(err, MissionError::FileNotFound(_)));
    }
}
