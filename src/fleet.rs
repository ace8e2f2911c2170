//! # Fleet モジュール
//!
//! 分離した複数機体の同時着陸（DECOUPLE & AUTO LANDING）を提供します。
//!
//! 各機体の着陸シーケンスは同期ブロッキングループのまま、機体ごとに
//! 独立したタスクとして`spawn_blocking`で起動し、ハンドルを収集して
//! 全機の完了を待ち合わせます。シーケンス間に共有可変状態はなく、
//! ロックも不要です（機体ハンドルが機体ごとに独立しているため）。
//! 1機の障害は当該機の結果としてのみ報告され、他機の着陸を阻害しません。

use tokio::runtime::Builder;
use tracing::{info, warn, error};

use crate::mission::MissionConfig;
use crate::sequencer::{LandingError, LandingParams, LandingSequencer};
use crate::vessel::common::LandingOutcome;
use crate::vessel::sim::SimVessel;

/// 1機分の着陸結果
#[derive(Debug)]
pub struct FleetReport {
    pub vessel_name: String,
    pub result: Result<LandingOutcome, LandingError>,
}

impl FleetReport {
    /// 正常接地したかどうか
    pub fn is_touchdown(&self) -> bool {
        matches!(self.result, Ok(LandingOutcome::Touchdown))
    }
}

/// 設定された機数の着陸シーケンスを同時実行
///
/// 機数1の場合は設定どおりの機体名で、2機以上の場合は分離機体として
/// `decoupled_<名前>_<番号>`の名前で起動します。全機の完了を待ち、
/// 機体ごとの結果を返します。
pub fn land_fleet(config: &MissionConfig) -> Result<Vec<FleetReport>, Box<dyn std::error::Error>> {
    let count = config.fleet.decoupler_count;

    info!(
        vessel_count = count,
        "FLEET_LANDING_START: 同時着陸シーケンスを開始します"
    );

    let runtime = Builder::new_multi_thread().build()?;

    let mut handles = Vec::with_capacity(count as usize);
    for index in 0..count {
        let vessel_name = if count == 1 {
            config.vessel.name.clone()
        } else {
            format!("decoupled_{}_{}", config.vessel.name, index + 1)
        };

        let params = LandingParams::from_mission(config);
        let vessel = SimVessel::new(vessel_name.clone(), &config.vessel, config.sim.dt_s);

        let handle = runtime.spawn_blocking(move || {
            let mut sequencer = LandingSequencer::new(vessel, params);
            sequencer.run()
        });
        handles.push((vessel_name, handle));
    }

    let reports = runtime.block_on(async move {
        let mut reports = Vec::with_capacity(handles.len());
        for (vessel_name, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    error!(
                        vessel = %vessel_name,
                        error = %join_err,
                        "FLEET_TASK_FAILED: 着陸タスクのジョインに失敗しました"
                    );
                    Err(LandingError::TaskFailed(join_err.to_string()))
                }
            };
            reports.push(FleetReport { vessel_name, result });
        }
        reports
    });

    let touchdowns = reports.iter().filter(|r| r.is_touchdown()).count();
    if touchdowns == reports.len() {
        info!(
            touchdowns,
            vessel_count = reports.len(),
            "FLEET_LANDING_COMPLETE: 全機の着陸が完了しました"
        );
    } else {
        warn!(
            touchdowns,
            vessel_count = reports.len(),
            "FLEET_LANDING_PARTIAL: 一部の機体が着陸に失敗しました"
        );
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// スリープなしの試験用ミッション
    fn test_mission(count: u32) -> MissionConfig {
        let mut config = MissionConfig::default_mission();
        config.fleet.decoupler_count = count;
        config.polling.approach_s = 0.0;
        config.polling.horizontal_s = 0.0;
        config.polling.descent_search_s = 0.0;
        config.polling.vertical_s = 0.0;
        config
    }

    #[test]
    fn test_single_vessel_keeps_configured_name() {
        let config = test_mission(1);
        let reports = land_fleet(&config).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].vessel_name, config.vessel.name);
        assert!(reports[0].is_touchdown());
    }

    #[test]
    fn test_decoupled_fleet_lands_concurrently() {
        let config = test_mission(3);
        let reports = land_fleet(&config).unwrap();
        assert_eq!(reports.len(), 3);
        for (index, report) in reports.iter().enumerate() {
            assert_eq!(
                report.vessel_name,
                format!("decoupled_{}_{}", config.vessel.name, index + 1)
            );
            assert!(report.is_touchdown(), "vessel {} failed", report.vessel_name);
        }
    }
}
