pub mod analysis;
pub mod loaders;
pub mod proxy;
pub mod quota;
pub mod table;

pub use analysis::AnalysisSpec;
pub use loaders::load_analysis_specs;
pub use proxy::ProxyDescriptor;
pub use quota::{QuotaLimits, QuotaState, DAY_WINDOW, MINUTE_WINDOW};
pub use table::{CellState, DataTable};
