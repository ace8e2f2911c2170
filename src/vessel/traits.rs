use crate::vessel::common::{TelemetrySample, Vector3};

/// テレメトリ読み出しエラー
///
/// 読み出し失敗は該当する着陸シーケンスのみの致命的エラーとして扱い、
/// 並行する他シーケンスには影響させません。
#[derive(Debug)]
pub enum TelemetryError {
    /// テレメトリ源との接続が失われた
    ConnectionLost(String),
    /// 読み出した値が物理的に不正（NaN等）
    InvalidReading(String),
}

impl std::fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelemetryError::ConnectionLost(msg) => {
                write!(f, "テレメトリ接続喪失: {}", msg)
            }
            TelemetryError::InvalidReading(msg) => {
                write!(f, "テレメトリ値不正: {}", msg)
            }
        }
    }
}

impl std::error::Error for TelemetryError {}

/// アクチュエーション書き込みエラー
#[derive(Debug)]
pub enum ActuationError {
    /// アクチュエーション先との接続が失われた
    ConnectionLost(String),
    /// コマンドが受理されなかった
    Rejected(String),
}

impl std::fmt::Display for ActuationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActuationError::ConnectionLost(msg) => {
                write!(f, "アクチュエーション接続喪失: {}", msg)
            }
            ActuationError::Rejected(msg) => {
                write!(f, "コマンド拒否: {}", msg)
            }
        }
    }
}

impl std::error::Error for ActuationError {}

/// テレメトリ源のインターフェース
///
/// 要求時に全フィールドの整合した瞬時値を返します。鮮度や遅延は外部側の
/// 責務であり、制御ループ側はキャッシュせず毎反復で読み直すことで
/// 小さなジッタを許容します。
pub trait ITelemetry {
    /// 現在のテレメトリサンプルの取得
    fn sample(&mut self) -> Result<TelemetrySample, TelemetryError>;

    /// 機体識別名の取得
    fn vessel_name(&self) -> String;
}

/// アクチュエーション先のインターフェース
///
/// 3つの制御フィールドは独立に受け付けます（部分更新可）。
/// 書き込みはlast-write-wins（後勝ち）です。
pub trait IActuation {
    /// 姿勢目標ベクトルの設定
    fn set_attitude_target(&mut self, target: Vector3) -> Result<(), ActuationError>;

    /// スロットルの設定（呼び出し側で[0,1]にクランプ済み）
    fn set_throttle(&mut self, throttle: f64) -> Result<(), ActuationError>;

    /// 着陸ギアの展開指示
    fn set_gear(&mut self, deployed: bool) -> Result<(), ActuationError>;

    /// SASの有効/無効
    fn set_sas(&mut self, enabled: bool) -> Result<(), ActuationError>;

    /// RCSの有効/無効
    fn set_rcs(&mut self, enabled: bool) -> Result<(), ActuationError>;

    /// 外部姿勢保持系（オートパイロット）の起動
    fn engage_autopilot(&mut self) -> Result<(), ActuationError>;

    /// 外部姿勢保持系の解除
    fn disengage_autopilot(&mut self) -> Result<(), ActuationError>;
}
