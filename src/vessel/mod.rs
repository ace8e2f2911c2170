// 基本的なデータ型と数学ユーティリティ
pub mod common;

// テレメトリ/アクチュエーションのインターフェース（trait）定義
pub mod traits;

// 模擬機体（外部伝送路の代替実装）
pub mod sim;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use sim::SimVessel;
